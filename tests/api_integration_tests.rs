//! Integration Tests for API Endpoints
//!
//! Drives the full router through `oneshot` against the in-process store and
//! a counting upstream double.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

use actions_proxy::api::create_router;
use actions_proxy::error::{AppError, Result};
use actions_proxy::proxy::{Upstream, UpstreamResponse};
use actions_proxy::store::MemoryStore;
use actions_proxy::{AppState, Config};

const FEED_BODY: &str = r#"<?xml version="1.0"?><rss><channel><title>The White House</title></channel></rss>"#;
const ENCODED_FEED: &str = "https%3A%2F%2Fwww.whitehouse.gov%2Ffeed%2F";

// == Helpers ==

#[derive(Default)]
struct CountingUpstream {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingUpstream {
    fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Upstream for CountingUpstream {
    async fn fetch(&self, url: &Url) -> Result<UpstreamResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Upstream(format!("{} returned 502", url)));
        }
        Ok(UpstreamResponse {
            body: FEED_BODY.as_bytes().to_vec(),
            content_type: "application/rss+xml; charset=UTF-8".to_string(),
        })
    }
}

struct SilentUpstream;

#[async_trait]
impl Upstream for SilentUpstream {
    async fn fetch(&self, url: &Url) -> Result<UpstreamResponse> {
        Err(AppError::UpstreamTimeout(format!("{} did not answer", url)))
    }
}

fn create_test_app(config: &Config, upstream: Arc<dyn Upstream>) -> Router {
    let state = AppState::new(Arc::new(MemoryStore::new(100)), upstream, config);
    create_router(state)
}

fn get(uri: &str, client: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec()
}

async fn body_to_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

// == Proxy Endpoint Tests ==

#[tokio::test]
async fn test_proxy_serves_second_request_from_cache() {
    let upstream = Arc::new(CountingUpstream::default());
    let app = create_test_app(&Config::default(), upstream.clone());
    let uri = format!("/proxy?url={}", ENCODED_FEED);

    let first = app.clone().oneshot(get(&uri, "10.0.0.1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()["x-cache"], "MISS");
    assert_eq!(
        first.headers()[header::CONTENT_TYPE],
        "application/rss+xml; charset=UTF-8"
    );
    let first_body = body_bytes(first.into_body()).await;

    let second = app.oneshot(get(&uri, "10.0.0.1")).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers()["x-cache"], "HIT");
    let second_body = body_bytes(second.into_body()).await;

    assert_eq!(first_body, second_body);
    assert_eq!(first_body, FEED_BODY.as_bytes());
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_proxy_rejects_foreign_host() {
    let upstream = Arc::new(CountingUpstream::default());
    let app = create_test_app(&Config::default(), upstream.clone());

    let response = app
        .oneshot(get("/proxy?url=https://evil.example.com", "10.0.0.2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "validation_error");
    assert!(json["message"].is_string());
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_proxy_rejects_encoded_traversal() {
    let upstream = Arc::new(CountingUpstream::default());
    let app = create_test_app(&Config::default(), upstream.clone());

    let response = app
        .oneshot(get(
            "/proxy?url=https%3A%2F%2Fwww.whitehouse.gov%2Ffeed%2F%252e%252e%2Fwp-admin",
            "10.0.0.3",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_proxy_missing_url_is_validation_error() {
    let upstream = Arc::new(CountingUpstream::default());
    let app = create_test_app(&Config::default(), upstream);

    let response = app.oneshot(get("/proxy", "10.0.0.4")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "validation_error");
    assert!(json["message"].as_str().unwrap().to_lowercase().contains("url"));
}

#[tokio::test]
async fn test_proxy_upstream_failure_is_generic_500() {
    let upstream = Arc::new(CountingUpstream::failing());
    let app = create_test_app(&Config::default(), upstream.clone());
    let uri = format!("/proxy?url={}", ENCODED_FEED);

    let response = app.clone().oneshot(get(&uri, "10.0.0.5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "upstream_error");
    assert!(!json["message"].as_str().unwrap().contains("502"));

    // Failures are not cached
    app.oneshot(get(&uri, "10.0.0.5")).await.unwrap();
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn test_proxy_upstream_timeout_is_500() {
    let app = create_test_app(&Config::default(), Arc::new(SilentUpstream));

    let response = app
        .oneshot(get(&format!("/proxy?url={}", ENCODED_FEED), "10.0.0.6"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "upstream_timeout");
}

#[tokio::test]
async fn test_proxy_unencoded_plus_hints_at_encoding() {
    let upstream = Arc::new(CountingUpstream::default());
    let app = create_test_app(&Config::default(), upstream.clone());

    let response = app
        .oneshot(get(
            "/proxy?url=https://www.whitehouse.gov/wp-json/wp/v2/search?search=a+b",
            "10.0.0.7",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("percent-encoded"));
    assert_eq!(upstream.calls(), 0);
}

// == Admission Tests ==

#[tokio::test]
async fn test_rate_limit_rejects_after_points_exhausted() {
    let config = Config {
        rate_limit_points: 3,
        ..Config::default()
    };
    let upstream = Arc::new(CountingUpstream::default());
    let app = create_test_app(&config, upstream.clone());
    let uri = format!("/proxy?url={}", ENCODED_FEED);

    for remaining in (0..3).rev() {
        let response = app.clone().oneshot(get(&uri, "192.0.2.7")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "3");
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            remaining.to_string().as_str()
        );
        let reset: u64 = response.headers()["x-ratelimit-reset"]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(reset > 0 && reset <= config.rate_limit_duration);
    }

    let response = app.clone().oneshot(get(&uri, "192.0.2.7")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= config.rate_limit_block_duration);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "rate_limited");

    // Another client is unaffected
    let other = app.clone().oneshot(get(&uri, "192.0.2.8")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);

    let stats = app.oneshot(get("/stats", "192.0.2.9")).await.unwrap();
    let json = body_to_json(stats.into_body()).await;
    assert_eq!(json["rateLimited"], 1);
}

#[tokio::test]
async fn test_rejected_requests_do_no_upstream_work() {
    let config = Config {
        rate_limit_points: 1,
        ..Config::default()
    };
    let upstream = Arc::new(CountingUpstream::default());
    let app = create_test_app(&config, upstream.clone());

    let uri = "/proxy?url=https%3A%2F%2Fwww.whitehouse.gov%2Fbriefing-room%2F";
    app.clone().oneshot(get(uri, "198.51.100.1")).await.unwrap();
    let response = app
        .oneshot(get(
            "/proxy?url=https%3A%2F%2Fwww.whitehouse.gov%2Fwp-json%2F",
            "198.51.100.1",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(upstream.calls(), 1);
}

// == Method Tests ==

#[tokio::test]
async fn test_post_to_proxy_is_method_not_allowed() {
    let upstream = Arc::new(CountingUpstream::default());
    let app = create_test_app(&Config::default(), upstream.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/proxy?url={}", ENCODED_FEED))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "method_not_allowed");
    assert_eq!(upstream.calls(), 0);
}

// == Health and Stats Tests ==

#[tokio::test]
async fn test_health_reports_store_usage() {
    let upstream = Arc::new(CountingUpstream::default());
    let app = create_test_app(&Config::default(), upstream);

    app.clone()
        .oneshot(get(&format!("/proxy?url={}", ENCODED_FEED), "10.1.1.1"))
        .await
        .unwrap();

    let response = app.oneshot(get("/health", "10.1.1.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json["uptime"].is_u64());
    assert!(json["timestamp"].is_string());
    assert_eq!(json["memoryUsage"]["backend"], "memory");
    // Cached response plus the client's window counter
    assert!(json["memoryUsage"]["entries"].as_u64().unwrap() >= 2);
}

#[tokio::test]
async fn test_stats_counts_hits_and_misses() {
    let upstream = Arc::new(CountingUpstream::default());
    let app = create_test_app(&Config::default(), upstream);
    let uri = format!("/proxy?url={}", ENCODED_FEED);

    for _ in 0..3 {
        app.clone().oneshot(get(&uri, "10.2.2.2")).await.unwrap();
    }

    let response = app.oneshot(get("/stats", "10.2.2.2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 2);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["upstreamFetches"], 1);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let upstream = Arc::new(CountingUpstream::default());
    let app = create_test_app(&Config::default(), upstream);

    let response = app.oneshot(get("/admin", "10.3.3.3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
