//! HTTP outcome client against a local one-shot server.

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use spindeck::outcome::http::HttpOutcomeClient;
use spindeck::outcome::OutcomeSource;
use spindeck::types::{Symbol, TransportError};

/// Serve a single request with a canned response. Returns the base URL
/// and a slot that receives the raw request once it arrives.
async fn serve_once(status: &str, body: &str) -> (String, Arc<Mutex<Option<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&seen);
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if request_complete(&buf) {
                break;
            }
        }
        *slot.lock().unwrap() = Some(String::from_utf8_lossy(&buf).into_owned());
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
    });

    (format!("http://{addr}"), seen)
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    buf.len() >= header_end + 4 + content_length
}

#[tokio::test]
async fn test_http_success_parses_outcome() {
    let body = r#"{"reels":[["🍒","🔔","💎"],["🍋","🔔","🎰"],["💎","🔔","🍒"]],"win":true,"payout":150,"balance":1000}"#;
    let (url, seen) = serve_once("200 OK", body).await;
    let client = HttpOutcomeClient::new(&url, None).unwrap();

    let outcome = client.fetch_outcome(50).await.unwrap();
    assert!(outcome.win);
    assert_eq!(outcome.payout, 150);
    assert_eq!(outcome.payline(), vec![Symbol::Bell; 3]);

    let request = seen.lock().unwrap().clone().unwrap();
    assert!(request.starts_with("POST /spin HTTP/1.1"));
    assert!(request.ends_with(r#"{"bet":50}"#));
}

#[tokio::test]
async fn test_http_error_status_carries_message() {
    let (url, _) = serve_once(
        "400 Bad Request",
        r#"{"error":"Invalid bet amount","message":"Bet must be greater than 0"}"#,
    )
    .await;
    let client = HttpOutcomeClient::new(&url, None).unwrap();

    let err = client.fetch_outcome(0).await.unwrap_err();
    assert_eq!(
        err,
        TransportError::Rejected {
            status: 400,
            message: "Invalid bet amount".into()
        }
    );
}

#[tokio::test]
async fn test_http_unknown_symbol_is_malformed() {
    let (url, _) = serve_once("200 OK", r#"{"reels":[["🍌"]],"win":false,"payout":0}"#).await;
    let client = HttpOutcomeClient::new(&url, None).unwrap();

    let err = client.fetch_outcome(50).await.unwrap_err();
    assert!(matches!(err, TransportError::Malformed(_)));
}

#[tokio::test]
async fn test_http_unreachable_is_request_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpOutcomeClient::new(&format!("http://{addr}"), None).unwrap();
    let err = client.fetch_outcome(50).await.unwrap_err();
    assert!(matches!(err, TransportError::Request(_)));
}
