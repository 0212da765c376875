//! Integration tests for the throttled fetch client
//!
//! These tests use wiremock servers to check pacing, retry and robots.txt
//! behavior against real HTTP round trips.

use recipe_harvest::config::FetchConfig;
use recipe_harvest::{FetchError, ThrottledClient};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetch_config(min_delay_ms: u64, max_attempts: u32, respect_robots: bool) -> FetchConfig {
    FetchConfig {
        min_delay_ms,
        max_attempts,
        backoff_base: 2.0,
        timeout_secs: 5,
        user_agents: vec!["TestBot/1.0".to_string(), "OtherBot/2.0".to_string()],
        respect_robots,
    }
}

fn client(server: &MockServer, config: &FetchConfig) -> ThrottledClient {
    ThrottledClient::new(config, &server.uri())
        .expect("client builds")
        .with_backoff_unit(Duration::from_millis(10))
}

async fn mount_page(server: &MockServer, page: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>ok</body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn request_count(server: &MockServer, page: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == page)
        .count()
}

#[tokio::test]
async fn test_consecutive_fetches_respect_min_delay() {
    let server = MockServer::start().await;
    mount_page(&server, "/recipes/dinner/stew").await;

    let delay = Duration::from_millis(120);
    let client = client(&server, &fetch_config(120, 1, false));
    let url = format!("{}/recipes/dinner/stew", server.uri());

    let n = 4;
    let start = Instant::now();
    for _ in 0..n {
        client.fetch(&url).await.unwrap();
    }

    assert!(start.elapsed() >= delay * (n - 1));
}

#[tokio::test]
async fn test_pacing_is_shared_between_clones() {
    let server = MockServer::start().await;
    mount_page(&server, "/recipes/dinner/stew").await;

    let delay = Duration::from_millis(150);
    let first = client(&server, &fetch_config(150, 1, false));
    let second = first.clone();
    let url = format!("{}/recipes/dinner/stew", server.uri());

    let start = Instant::now();
    let (a, b) = tokio::join!(first.fetch(&url), second.fetch(&url));
    a.unwrap();
    b.unwrap();

    assert!(start.elapsed() >= delay);
}

#[tokio::test]
async fn test_failures_consume_pacing_slot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(&server, "/recipes/dinner/stew").await;

    let delay = Duration::from_millis(120);
    let client = client(&server, &fetch_config(120, 1, false));

    let start = Instant::now();
    assert!(client.fetch(&format!("{}/missing", server.uri())).await.is_err());
    client
        .fetch(&format!("{}/recipes/dinner/stew", server.uri()))
        .await
        .unwrap();

    assert!(start.elapsed() >= delay);
}

#[tokio::test]
async fn test_retry_recovers_after_transient_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recipes/dinner/stew"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(&server, "/recipes/dinner/stew").await;

    let client = client(&server, &fetch_config(0, 3, false));
    let url = format!("{}/recipes/dinner/stew", server.uri());

    let doc = client.fetch_with_retry(&url, 3).await.unwrap();
    let doc = doc.expect("third attempt succeeds");
    assert_eq!(doc.status, 200);
    assert!(doc.body.contains("ok"));
    assert_eq!(request_count(&server, "/recipes/dinner/stew").await, 3);
}

#[tokio::test]
async fn test_exhausted_retries_return_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recipes/dinner/stew"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client(&server, &fetch_config(0, 2, false));
    let url = format!("{}/recipes/dinner/stew", server.uri());

    let result = client.fetch_with_retry(&url, 2).await;
    assert!(matches!(result, Ok(None)));
    assert_eq!(request_count(&server, "/recipes/dinner/stew").await, 2);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recipes/dinner/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client(&server, &fetch_config(0, 3, false));
    let url = format!("{}/recipes/dinner/gone", server.uri());

    match client.fetch_with_retry(&url, 3).await {
        Err(FetchError::HttpStatus { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected HttpStatus(404), got {:?}", other.map(|d| d.is_some())),
    }
    assert_eq!(request_count(&server, "/recipes/dinner/gone").await, 1);
}

#[tokio::test]
async fn test_robots_disallow_blocks_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/\n"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/private/recipes/x").await;
    mount_page(&server, "/recipes/dinner/stew").await;

    let client = client(&server, &fetch_config(0, 3, true));

    let blocked = client
        .fetch(&format!("{}/private/recipes/x", server.uri()))
        .await;
    assert!(matches!(blocked, Err(FetchError::Disallowed { .. })));
    assert_eq!(request_count(&server, "/private/recipes/x").await, 0);

    client
        .fetch(&format!("{}/recipes/dinner/stew", server.uri()))
        .await
        .unwrap();
    assert_eq!(request_count(&server, "/robots.txt").await, 1);
}

#[tokio::test]
async fn test_robots_unavailable_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, "/recipes/dinner/stew").await;

    let client = client(&server, &fetch_config(0, 1, true));
    let doc = client
        .fetch(&format!("{}/recipes/dinner/stew", server.uri()))
        .await
        .unwrap();
    assert_eq!(doc.status, 200);
}

#[tokio::test]
async fn test_crawl_delay_raises_min_delay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 3\n"))
        .mount(&server)
        .await;

    let client = client(&server, &fetch_config(100, 1, true));
    client.load_robots().await;
    assert_eq!(client.min_delay().await, Duration::from_secs(3));
}

#[tokio::test]
async fn test_cancelled_client_does_not_fetch() {
    let server = MockServer::start().await;
    mount_page(&server, "/recipes/dinner/stew").await;

    let cancel = CancellationToken::new();
    let client = client(&server, &fetch_config(0, 1, false)).with_cancellation(cancel.clone());
    cancel.cancel();

    let result = client
        .fetch(&format!("{}/recipes/dinner/stew", server.uri()))
        .await;
    assert!(matches!(result, Err(FetchError::Cancelled { .. })));
    assert_eq!(request_count(&server, "/recipes/dinner/stew").await, 0);
}
