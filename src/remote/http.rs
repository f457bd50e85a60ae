use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use super::{MapBounds, MapSource, RemoteCell, RemoteError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP client for the wireless map service.
///
/// Wire contract: `GET {base}/size` returns the bounds object and
/// `GET {base}/wilibox-column?x=N` returns the cells of one column.
pub struct HttpMapSource {
    client: Client,
    base_url: String,
}

impl HttpMapSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
    ) -> Result<T, RemoteError> {
        debug!("GET {url}");
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Http {
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|err| {
            if err.is_decode() {
                RemoteError::Decode(err.to_string())
            } else {
                RemoteError::Transport(err)
            }
        })
    }
}

#[async_trait]
impl MapSource for HttpMapSource {
    async fn bounds(&self) -> Result<MapBounds, RemoteError> {
        self.get_json(format!("{}/size", self.base_url)).await
    }

    async fn column(&self, x: i32) -> Result<Vec<RemoteCell>, RemoteError> {
        self.get_json(format!("{}/wilibox-column?x={x}", self.base_url))
            .await
    }
}
