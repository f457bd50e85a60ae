//! HTTP client behavior against a scripted local listener: endpoint paths,
//! camelCase/null decoding, and status-code error mapping.

use std::sync::{Arc, Mutex};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};
use wireless_map_cache::{HttpMapSource, MapSource, RemoteError};

/// Serve one scripted response per connection, capturing each request line.
async fn spawn_server(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().unwrap();

    let requests = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&requests);

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut stream, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => return,
            };

            let mut buf = vec![0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap_or(0);
            let head = String::from_utf8_lossy(&buf[..n]).to_string();
            if let Some(line) = head.lines().next() {
                captured.lock().unwrap().push(line.to_string());
            }

            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (format!("http://{addr}"), requests)
}

#[tokio::test]
async fn bounds_and_column_use_the_documented_endpoints() {
    let (base_url, requests) = spawn_server(vec![
        (200, r#"{"minX":0,"maxX":2,"minY":1,"maxY":3}"#),
        (
            200,
            r#"[{"x":1,"y":2,"strength1":-40,"strength2":null,"strength3":7}]"#,
        ),
    ])
    .await;

    // Trailing slash must not produce a double-slash path.
    let source = HttpMapSource::new(format!("{base_url}/")).unwrap();

    let bounds = source.bounds().await.unwrap();
    assert_eq!(
        (bounds.min_x, bounds.max_x, bounds.min_y, bounds.max_y),
        (0, 2, 1, 3)
    );

    let cells = source.column(1).await.unwrap();
    assert_eq!(cells.len(), 1);
    assert_eq!((cells[0].x, cells[0].y), (1, 2));
    assert_eq!(cells[0].strength1, Some(-40));
    assert_eq!(cells[0].strength2, None);
    assert_eq!(cells[0].strength3, Some(7));

    let lines = requests.lock().unwrap().clone();
    assert_eq!(lines[0], "GET /size HTTP/1.1");
    assert_eq!(lines[1], "GET /wilibox-column?x=1 HTTP/1.1");
}

#[tokio::test]
async fn non_2xx_maps_to_an_http_error() {
    let (base_url, _requests) = spawn_server(vec![(503, "busy")]).await;
    let source = HttpMapSource::new(base_url).unwrap();

    match source.bounds().await {
        Err(RemoteError::Http { status }) => assert_eq!(status, 503),
        other => panic!("expected RemoteError::Http, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_maps_to_a_decode_error() {
    let (base_url, _requests) = spawn_server(vec![(200, "not json")]).await;
    let source = HttpMapSource::new(base_url).unwrap();

    match source.bounds().await {
        Err(RemoteError::Decode(_)) => {}
        other => panic!("expected RemoteError::Decode, got {other:?}"),
    }
}
