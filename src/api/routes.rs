//! API Routes
//!
//! Configures the Axum router with all proxy endpoints.

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use super::handlers::{
    admission, health_handler, method_not_allowed, proxy_handler, stats_handler, AppState,
};
use crate::config::AllowedOrigins;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /proxy?url=...` - Proxy an allow-listed upstream URL
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Proxy counters
///
/// # Middleware
/// - Admission control on `/proxy` only
/// - CORS: configured origins, GET only
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    let proxy_route = get(proxy_handler)
        .route_layer(middleware::from_fn_with_state(state.clone(), admission))
        .fallback(method_not_allowed);

    Router::new()
        .route("/proxy", proxy_route)
        .route("/health", get(health_handler).fallback(method_not_allowed))
        .route("/stats", get(stats_handler).fallback(method_not_allowed))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    match origins {
        AllowedOrigins::Any => layer.allow_origin(Any),
        AllowedOrigins::List(list) => {
            let values = list.iter().filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            });
            layer.allow_origin(AllowOrigin::list(values))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::Result;
    use crate::proxy::{Upstream, UpstreamResponse};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;
    use url::Url;

    struct StaticUpstream;

    #[async_trait]
    impl Upstream for StaticUpstream {
        async fn fetch(&self, _url: &Url) -> Result<UpstreamResponse> {
            Ok(UpstreamResponse {
                body: b"<rss/>".to_vec(),
                content_type: "application/rss+xml".to_string(),
            })
        }
    }

    fn create_test_app(config: &Config) -> Router {
        let state = AppState::new(
            Arc::new(MemoryStore::new(100)),
            Arc::new(StaticUpstream),
            config,
        );
        create_router(state)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app(&Config::default());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_is_method_not_allowed() {
        let app = create_test_app(&Config::default());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/proxy?url=https%3A%2F%2Fwww.whitehouse.gov%2Ffeed%2F")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_cors_allows_listed_origin() {
        let config = Config {
            allowed_origins: AllowedOrigins::List(vec!["https://actions.example".into()]),
            ..Config::default()
        };
        let app = create_test_app(&config);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "https://actions.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://actions.example"
        );
    }

    #[tokio::test]
    async fn test_cors_omits_unlisted_origin() {
        let config = Config {
            allowed_origins: AllowedOrigins::List(vec!["https://actions.example".into()]),
            ..Config::default()
        };
        let app = create_test_app(&config);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "https://other.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().get("access-control-allow-origin").is_none());
    }
}
