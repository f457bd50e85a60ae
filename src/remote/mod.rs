//! Remote map source: the consumed network contract and its HTTP client.

pub mod http;
pub mod model;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpMapSource;
pub use model::{MapBounds, RemoteCell};

/// Transport/protocol-level failures talking to the remote source. Storage
/// errors are deliberately not part of this taxonomy.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote source returned HTTP {status}")]
    Http { status: u16 },

    #[error("failed to reach remote source: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode remote response: {0}")]
    Decode(String),
}

/// The remote service the cache synchronizes against. Only two calls exist:
/// the rectangle bounds, and one column of cells at a time.
#[async_trait]
pub trait MapSource: Send + Sync {
    async fn bounds(&self) -> Result<MapBounds, RemoteError>;

    /// Cells reported for column `x`. The list may be sparse or empty; it is
    /// the sync engine's job to densify over the bounds.
    async fn column(&self, x: i32) -> Result<Vec<RemoteCell>, RemoteError>;
}
