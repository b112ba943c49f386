//! Integration tests for the HTTP catalog

use tickwatch::catalog::{CatalogSource, HttpCatalog};
use tickwatch::config::CatalogConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one canned HTTP response and return the base URL
async fn serve_once(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let n = socket.read(&mut buf).await.unwrap();
        let request = String::from_utf8_lossy(&buf[..n]);
        assert!(request.starts_with("GET /api/stocks "), "{request}");

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    format!("http://{addr}")
}

fn catalog(base_url: String) -> HttpCatalog {
    HttpCatalog::new(&CatalogConfig {
        base_url,
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_symbols_in_catalog_order() {
    let base = serve_once(
        "200 OK",
        r#"{"stocks":[{"symbol":"TSLA","name":"Tesla, Inc."},{"symbol":"AAPL","name":"Apple Inc."}]}"#,
    )
    .await;

    let symbols = catalog(base).fetch_symbols().await.unwrap();
    assert_eq!(symbols.len(), 2);
    assert_eq!(symbols[0].symbol.as_str(), "TSLA");
    assert_eq!(symbols[0].display_name, "Tesla, Inc.");
    assert_eq!(symbols[1].symbol.as_str(), "AAPL");
}

#[tokio::test]
async fn test_error_status_is_unavailable() {
    let base = serve_once("503 Service Unavailable", "down for maintenance").await;

    let err = catalog(base).fetch_symbols().await.unwrap_err();
    assert!(err.to_string().starts_with("Catalog unavailable"));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_invalid_body_is_unavailable() {
    let base = serve_once("200 OK", r#"{"symbols":[]}"#).await;
    assert!(catalog(base).fetch_symbols().await.is_err());
}

#[tokio::test]
async fn test_unreachable_catalog_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = catalog(format!("http://{addr}")).fetch_symbols().await;
    assert!(result.is_err());
}
