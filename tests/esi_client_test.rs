// tests/esi_client_test.rs — ESI client caching against a local HTTP server

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use reqwest::Method;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use eveapi::esi::cache::{CacheEntry, EsiCache};
use eveapi::esi::{EsiClient, EsiRequest};
use eveapi::infra::config::Config;
use eveapi::infra::errors::EveApiError;

// ---------- Canned server ----------

/// Answers each incoming connection with the next canned response and
/// records the raw request head it received.
struct CannedServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedServer {
    async fn start(responses: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }
                seen.lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&head).to_lowercase());
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });

        Self { base_url, requests }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn response(status_line: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut out = format!("HTTP/1.1 {status_line}\r\n");
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    ));
    out
}

// ---------- Helpers ----------

fn client(base_url: &str, cache_dir: &std::path::Path) -> EsiClient {
    let mut config = Config::default();
    config.esi.base_url = base_url.to_string();
    config.esi.max_retries = 0;
    EsiClient::new(&config, Some(EsiCache::new(cache_dir))).unwrap()
}

fn request() -> EsiRequest {
    EsiRequest::new(Method::GET, "v1", "/corporations/{corporation_id}/divisions/")
        .path_value("corporation_id", 98000001)
}

fn cache_key(client: &EsiClient, request: &EsiRequest) -> String {
    let url = client.url_for(request).unwrap();
    EsiCache::key_for("GET", url.as_str(), None)
}

// ---------- Tests ----------

#[tokio::test]
async fn test_fresh_entry_is_served_without_a_request() {
    let server = CannedServer::start(Vec::new()).await;
    let dir = tempfile::tempdir().unwrap();
    let esi = client(&server.base_url, dir.path());
    let req = request();

    EsiCache::new(dir.path()).save(
        &cache_key(&esi, &req),
        &CacheEntry {
            etag: Some("\"abc\"".into()),
            expires: Some(Utc::now() + Duration::hours(1)),
            body: "[1]".into(),
        },
    );

    let resp = esi.retrieve(&req, None).await.unwrap();

    assert!(resp.is_cached_load());
    assert_eq!(resp.body, "[1]");
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_stale_entry_is_revalidated_and_reused_on_304() {
    let server = CannedServer::start(vec![response(
        "304 Not Modified",
        &[("ETag", "\"abc\"")],
        "",
    )])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let esi = client(&server.base_url, dir.path());
    let req = request();
    let key = cache_key(&esi, &req);

    let cache = EsiCache::new(dir.path());
    cache.save(
        &key,
        &CacheEntry {
            etag: Some("\"abc\"".into()),
            expires: Some(Utc::now() - Duration::minutes(5)),
            body: "[1]".into(),
        },
    );

    let resp = esi.retrieve(&req, None).await.unwrap();

    assert!(resp.is_cached_load());
    assert_eq!(resp.status, 304);
    assert_eq!(resp.body, "[1]");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].contains("if-none-match: \"abc\""));

    // The cached body survives revalidation.
    assert_eq!(cache.load(&key).unwrap().body, "[1]");
}

#[tokio::test]
async fn test_successful_get_is_stored_with_its_etag() {
    let server = CannedServer::start(vec![response(
        "200 OK",
        &[
            ("Content-Type", "application/json"),
            ("ETag", "\"v2\""),
            ("Expires", "Wed, 21 Oct 2015 07:28:00 GMT"),
        ],
        "[2]",
    )])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let esi = client(&server.base_url, dir.path());
    let req = request();

    let resp = esi.retrieve(&req, None).await.unwrap();

    assert!(!resp.is_cached_load());
    assert_eq!(resp.body, "[2]");
    assert!(!server.requests()[0].contains("if-none-match"));

    let stored = EsiCache::new(dir.path())
        .load(&cache_key(&esi, &req))
        .unwrap();
    assert_eq!(stored.etag.as_deref(), Some("\"v2\""));
    assert_eq!(stored.body, "[2]");
}

#[tokio::test]
async fn test_error_limit_reports_reset_window() {
    let server = CannedServer::start(vec![response(
        "420 Enhance Your Calm",
        &[
            ("Content-Type", "application/json"),
            ("X-Esi-Error-Limit-Reset", "7"),
        ],
        "{\"error\":\"error limited\"}",
    )])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let esi = client(&server.base_url, dir.path());

    let err = esi.retrieve(&request(), None).await.unwrap_err();

    assert!(matches!(
        err,
        EveApiError::ErrorLimited {
            retry_after_secs: 7
        }
    ));
    assert_eq!(server.requests().len(), 1);
}
