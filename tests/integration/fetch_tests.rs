//! Integration tests for the retrying fetcher
//!
//! Rate limiting, status handling, transport failures and the global request
//! cap, checked against wiremock servers.

use catalog_ripple::config::{CrawlerConfig, PauseRange};
use catalog_ripple::crawler::{build_http_client, AdmissionGate, RateLimitedFetcher, RetryPolicy};
use reqwest::header::HeaderMap;
use serde_json::json;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(max_retries: u32, capacity: usize) -> RateLimitedFetcher {
    let policy = RetryPolicy {
        max_retries,
        backoff_base: 2.0,
        backoff_scale: Duration::ZERO,
        jitter: PauseRange::from_millis(0, 0),
        default_retry_after: Duration::from_secs(1),
    };
    let client = build_http_client(&CrawlerConfig::default()).unwrap();
    RateLimitedFetcher::new(client, AdmissionGate::new(capacity), policy)
}

/// Level and `event` field of every event this crate emits
#[derive(Clone, Default)]
struct CapturedEvents(Arc<Mutex<Vec<(Level, Option<String>)>>>);

impl CapturedEvents {
    fn at(&self, level: Level) -> Vec<Option<String>> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, name)| name.clone())
            .collect()
    }
}

#[derive(Default)]
struct EventName(Option<String>);

impl Visit for EventName {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "event" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "event" && self.0.is_none() {
            self.0 = Some(format!("{:?}", value).trim_matches('"').to_string());
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with("catalog_ripple") {
            return;
        }
        let mut name = EventName::default();
        event.record(&mut name);
        self.0
            .lock()
            .unwrap()
            .push((*event.metadata().level(), name.0));
    }
}

/// An address with nothing listening on it
fn closed_port() -> std::net::SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

#[tokio::test]
async fn test_success_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/artists/A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "A1" })))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(3, 4);
    let body = fetcher
        .fetch(&format!("{}/artists/A1", server.uri()), &HeaderMap::new())
        .await;

    assert_eq!(body, Some(json!({ "id": "A1" })));
    assert_eq!(fetcher.stats().attempts(), 1);
    assert_eq!(fetcher.stats().succeeded(), 1);
}

#[tokio::test]
async fn test_rate_limit_waits_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tracks/T1"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tracks/T1"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tracks/T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "T1" })))
        .mount(&server)
        .await;

    let fetcher = fetcher(3, 4);
    let start = Instant::now();
    let body = fetcher
        .fetch(&format!("{}/tracks/T1", server.uri()), &HeaderMap::new())
        .await;

    assert_eq!(body, Some(json!({ "id": "T1" })));
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_eq!(fetcher.stats().rate_limited(), 2);
    assert_eq!(fetcher.stats().attempts(), 3);
}

#[tokio::test]
async fn test_rate_limit_exhausts_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = fetcher(2, 4);
    let body = fetcher
        .fetch(&format!("{}/albums/L1", server.uri()), &HeaderMap::new())
        .await;

    assert!(body.is_none());
    assert_eq!(fetcher.stats().failed_permanently(), 1);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/albums/L1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(3, 4);
    let body = fetcher
        .fetch(&format!("{}/albums/L1", server.uri()), &HeaderMap::new())
        .await;

    assert!(body.is_none());
    assert_eq!(fetcher.stats().attempts(), 1);
    assert_eq!(fetcher.stats().abandoned(), 1);
    assert_eq!(fetcher.stats().failed_permanently(), 0);
}

#[tokio::test]
async fn test_invalid_json_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
        .mount(&server)
        .await;

    let fetcher = fetcher(3, 4);
    let body = fetcher
        .fetch(&format!("{}/x", server.uri()), &HeaderMap::new())
        .await;

    assert_eq!(body, Some(json!([1, 2])));
    assert_eq!(fetcher.stats().attempts(), 2);
}

#[tokio::test]
async fn test_unreachable_host_fails_permanently_once() {
    let addr = closed_port();

    let fetcher = fetcher(3, 4);
    let body = fetcher
        .fetch(&format!("http://{}/artists/A1", addr), &HeaderMap::new())
        .await;

    assert!(body.is_none());
    assert_eq!(fetcher.stats().attempts(), 3);
    assert_eq!(fetcher.stats().failed_permanently(), 1);
    assert_eq!(fetcher.gate().in_flight(), 0);
}

#[tokio::test]
async fn test_transport_failures_log_one_permanent_event() {
    let events = CapturedEvents::default();
    let subscriber = tracing_subscriber::registry().with(events.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let fetcher = fetcher(3, 4);
    let body = fetcher
        .fetch(&format!("http://{}/tracks/T1", closed_port()), &HeaderMap::new())
        .await;
    assert!(body.is_none());

    // One warning per failed attempt, one error when the attempts run out
    assert_eq!(events.at(Level::WARN).len(), 3);
    assert_eq!(
        events.at(Level::ERROR),
        vec![Some("fetch.failed_permanently".to_string())]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_requests_in_flight_never_exceed_gate() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": true }))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;

    let fetcher = fetcher(1, 4);
    let mut handles = Vec::new();
    for i in 0..20 {
        let fetcher = fetcher.clone();
        let url = format!("{}/tracks/T{}", server.uri(), i);
        handles.push(tokio::spawn(async move {
            fetcher.fetch(&url, &HeaderMap::new()).await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }

    assert!(fetcher.gate().peak() <= 4);
    assert!(fetcher.gate().peak() >= 2);
    assert_eq!(fetcher.gate().in_flight(), 0);
    assert_eq!(fetcher.stats().succeeded(), 20);
}
