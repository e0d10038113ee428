//! Upstream fetcher
//!
//! One GET per cache miss, with a fixed user-agent and a bounded timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect;
use tracing::{debug, warn};
use url::Url;

use super::allowlist::is_allowed;
use crate::error::{AppError, Result};

/// Content-type used when upstream omits the header.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 5;

// == Upstream Response ==
/// A successful upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub body: Vec<u8>,
    pub content_type: String,
}

// == Upstream Trait ==
/// Outbound fetch used on cache misses.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetches `url`. Non-2xx statuses are errors.
    async fn fetch(&self, url: &Url) -> Result<UpstreamResponse>;
}

// == HTTP Upstream ==
/// `reqwest`-backed upstream client.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpUpstream {
    /// Builds a client sending `user_agent` and giving up after `timeout`.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(allow_listed_redirects())
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, url: &Url) -> Result<UpstreamResponse> {
        debug!("Fetching upstream {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Upstream {} answered {}", url, status);
            return Err(AppError::Upstream(format!("{} returned {}", url, status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, self.timeout, e))?;

        Ok(UpstreamResponse {
            body: body.to_vec(),
            content_type,
        })
    }
}

/// Follows a redirect only when its target passes the allow-list. A stopped
/// redirect surfaces as a non-2xx response.
fn allow_listed_redirects() -> redirect::Policy {
    redirect::Policy::custom(|attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if is_allowed(attempt.url().as_str()) {
            attempt.follow()
        } else {
            warn!("Refusing redirect to {}", attempt.url());
            attempt.stop()
        }
    })
}

fn transport_error(url: &Url, timeout: Duration, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::UpstreamTimeout(format!("{} did not answer within {:?}", url, timeout))
    } else {
        AppError::Upstream(format!("{}: {}", url, e))
    }
}
