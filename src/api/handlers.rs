//! API Handlers
//!
//! HTTP request handlers and the admission middleware.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{RawQuery, Request, State},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use super::client::ClientId;
use crate::admission::{ceil_secs, RateLimiter};
use crate::config::{AllowedOrigins, Config};
use crate::error::{AppError, Result};
use crate::models::{HealthResponse, ProxyQuery, StatsResponse};
use crate::proxy::{canonicalize, upstream::DEFAULT_CONTENT_TYPE, ProxyService, ProxyStats, Upstream};
use crate::store::KvStore;

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache-aside proxy
    pub proxy: ProxyService,
    /// Per-client admission control
    pub limiter: RateLimiter,
    /// CORS origins
    pub allowed_origins: AllowedOrigins,
    /// Server start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Wires the proxy and limiter over one shared store.
    pub fn new(store: Arc<dyn KvStore>, upstream: Arc<dyn Upstream>, config: &Config) -> Self {
        let proxy = ProxyService::new(
            store.clone(),
            upstream,
            config.cache_ttl(),
            Arc::new(ProxyStats::new()),
        );

        Self {
            proxy,
            limiter: RateLimiter::new(store, config.rate_limit()),
            allowed_origins: config.allowed_origins.clone(),
            started_at: Instant::now(),
        }
    }
}

/// Middleware applying admission control before any proxied work.
pub async fn admission(
    State(state): State<AppState>,
    client: ClientId,
    request: Request,
    next: Next,
) -> Result<Response> {
    let admitted = match state.limiter.admit(client.as_str()).await {
        Ok(admitted) => admitted,
        Err(e) => {
            if matches!(e, AppError::RateLimited { .. }) {
                state.proxy.stats().record_rate_limited();
            }
            return Err(e);
        }
    };

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(state.limiter.config().points));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(admitted.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(ceil_secs(admitted.resets_in)));

    Ok(response)
}

/// Handler for GET /proxy?url=...
///
/// Validates the target against the allow-list, then serves it from cache
/// or upstream with the upstream content-type.
pub async fn proxy_handler(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Response> {
    let query = ProxyQuery::parse(raw.as_deref());
    let url = canonicalize(query.target()?)?;

    let proxied = state.proxy.proxy(&url).await?;
    debug!("{} {} ({} bytes)", proxied.cache.as_str(), url, proxied.body.len());

    let content_type = HeaderValue::from_str(&proxied.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let mut response = (StatusCode::OK, proxied.body).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(X_CACHE, HeaderValue::from_static(proxied.cache.as_str()));

    Ok(response)
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.proxy.store();
    let usage = store.usage().await;

    Json(HealthResponse::healthy(
        state.started_at.elapsed().as_secs(),
        store.backend(),
        usage,
    ))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.proxy.stats().snapshot()))
}

/// Fallback for any method other than GET.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
