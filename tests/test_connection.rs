use std::sync::Arc;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use nvhttpd::cache::ContentCache;
use nvhttpd::http::connection::Connection;
use nvhttpd::server::transport::Transport;

/// Content tree with an index page and the standard error pages.
async fn full_site() -> (TempDir, Arc<ContentCache>) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub").join("index.html"), "sub page").unwrap();
    for code in ["400", "404", "500", "501"] {
        let page = dir.path().join("error").join(code);
        std::fs::create_dir_all(&page).unwrap();
        std::fs::write(page.join("index.html"), format!("error page {code}")).unwrap();
    }

    let cache = Arc::new(ContentCache::new());
    cache.load(dir.path()).await.unwrap();
    (dir, cache)
}

/// Runs one request through a connection worker over an in-memory duplex
/// stream and returns everything the worker wrote back.
async fn exchange(cache: Arc<ContentCache>, extra_headers: &str, request: &[u8]) -> Vec<u8> {
    let (mut client, server) = tokio::io::duplex(65536);
    let extra_headers: Arc<str> = Arc::from(extra_headers);
    let worker = tokio::spawn(async move {
        let mut connection = Connection::new(Transport::new(server), cache, extra_headers);
        connection.run().await.unwrap();
    });

    client.write_all(request).await.unwrap();
    // Close the write half so a worker waiting for more request bytes sees
    // EOF instead of blocking forever.
    client.shutdown().await.unwrap();
    let mut reply = Vec::new();
    client.read_to_end(&mut reply).await.unwrap();
    worker.await.unwrap();
    reply
}

fn body_of(raw: &[u8]) -> &[u8] {
    let pos = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator");
    &raw[pos + 4..]
}

#[tokio::test]
async fn test_get_root_serves_index() {
    let (_dir, cache) = full_site().await;
    let reply = exchange(cache, "", b"GET / HTTP/1.1\r\n\r\n").await;
    let text = String::from_utf8_lossy(&reply);

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"), "{text}");
    assert!(text.contains("\r\nContent-Type: text/html; charset=UTF-8\r\n"));
    assert!(text.contains("\r\nContent-Length: 13\r\n"));
    assert_eq!(body_of(&reply), b"<html></html>");
}

#[tokio::test]
async fn test_head_sends_headers_only() {
    let (_dir, cache) = full_site().await;
    let reply = exchange(cache, "", b"HEAD /index.html HTTP/1.1\r\n\r\n").await;
    let text = String::from_utf8_lossy(&reply);

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("\r\nContent-Length: 13\r\n"));
    assert_eq!(body_of(&reply), b"");
}

#[tokio::test]
async fn test_get_missing_serves_404_page() {
    let (_dir, cache) = full_site().await;
    let reply = exchange(cache, "", b"GET /missing HTTP/1.1\r\n\r\n").await;
    let text = String::from_utf8_lossy(&reply);

    assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"), "{text}");
    assert_eq!(body_of(&reply), b"error page 404");
}

#[tokio::test]
async fn test_post_is_not_implemented() {
    let (_dir, cache) = full_site().await;
    let reply = exchange(cache, "", b"POST /x HTTP/1.1\r\n\r\n").await;
    let text = String::from_utf8_lossy(&reply);

    assert!(text.starts_with("HTTP/1.1 501 Not Implemented\r\n"), "{text}");
    // The parsed method is not GET, so the error page body stays home.
    assert_eq!(body_of(&reply), b"");
    assert!(text.contains(&format!("\r\nContent-Length: {}\r\n", "error page 501".len())));
}

#[tokio::test]
async fn test_request_without_uri_is_bad_request() {
    let (_dir, cache) = full_site().await;
    let reply = exchange(cache, "", b"GET\r\n").await;
    let text = String::from_utf8_lossy(&reply);

    assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{text}");
    assert_eq!(body_of(&reply), b"error page 400");
}

#[tokio::test]
async fn test_simple_request_gets_body() {
    let (_dir, cache) = full_site().await;
    let reply = exchange(cache, "", b"GET /index.html\n").await;
    let text = String::from_utf8_lossy(&reply);

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body_of(&reply), b"<html></html>");
}

#[tokio::test]
async fn test_directory_request_serves_its_index() {
    let (_dir, cache) = full_site().await;
    let reply = exchange(cache, "", b"GET /sub/ HTTP/1.1\r\n\r\n").await;

    assert_eq!(body_of(&reply), b"sub page");
}

#[tokio::test]
async fn test_missing_error_page_falls_back_to_plain_text() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
    let cache = Arc::new(ContentCache::new());
    cache.load(dir.path()).await.unwrap();

    let reply = exchange(cache, "", b"GET /missing HTTP/1.1\r\n\r\n").await;
    let text = String::from_utf8_lossy(&reply);

    assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(text.contains("\r\nContent-Type: text/plain\r\n"));
    assert_eq!(body_of(&reply), b"404 Not Found");
}

#[tokio::test]
async fn test_transport_failure_drops_connection_silently() {
    let (_dir, cache) = full_site().await;
    // Peer disappears mid-request-line; no response is owed.
    let reply = exchange(cache, "", b"GET /inde").await;
    assert!(reply.is_empty());
}

#[tokio::test]
async fn test_configured_headers_appear_in_response() {
    let (_dir, cache) = full_site().await;
    let reply = exchange(
        cache,
        "Server: nvhttpd\r\nX-Frame-Options: DENY\r\n",
        b"GET / HTTP/1.1\r\n\r\n",
    )
    .await;
    let text = String::from_utf8_lossy(&reply);

    assert!(text.contains("\r\nServer: nvhttpd\r\n"));
    assert!(text.contains("\r\nX-Frame-Options: DENY\r\n"));
}

#[tokio::test]
async fn test_percent_encoded_request_resolves_decoded_path() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a b.html"), "spaced").unwrap();
    let cache = Arc::new(ContentCache::new());
    cache.load(dir.path()).await.unwrap();

    let reply = exchange(cache, "", b"GET /a%20b.html HTTP/1.1\r\n\r\n").await;
    assert_eq!(body_of(&reply), b"spaced");
}
