//! Feed Loader
//!
//! Serves the local cache while it is fresh, otherwise fetches the feed
//! through the proxy with a fixed number of attempts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::extract::extract;
use super::item::ActionItem;
use super::local_cache::{FeedStorage, LocalFeedCache};
use super::{FeedError, RETRY_HINT};

/// Attempts made per network load.
pub const MAX_RETRIES: u32 = 3;

/// Pause between two attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// == Feed Source ==
/// Where the raw feed document comes from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(&self) -> Result<String, FeedError>;
}

#[derive(Debug, Deserialize)]
struct ProxyErrorBody {
    message: String,
}

/// Fetches the feed through the proxy's `/proxy` endpoint.
#[derive(Debug, Clone)]
pub struct ProxyFeedSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl ProxyFeedSource {
    /// Builds a source for `feed_url` behind the proxy at `proxy_base`.
    pub fn new(proxy_base: &str, feed_url: &str) -> Result<Self, FeedError> {
        let base = Url::parse(proxy_base)
            .map_err(|e| FeedError::Http(format!("invalid proxy URL {}: {}", proxy_base, e)))?;
        let mut endpoint = base
            .join("proxy")
            .map_err(|e| FeedError::Http(format!("invalid proxy URL {}: {}", proxy_base, e)))?;
        endpoint.query_pairs_mut().append_pair("url", feed_url);

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FeedError::Http(e.to_string()))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl FeedSource for ProxyFeedSource {
    async fn fetch_feed(&self) -> Result<String, FeedError> {
        debug!("GET {}", self.endpoint);
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| FeedError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProxyErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected response")
                        .to_string()
                });
            return Err(FeedError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .text()
            .await
            .map_err(|e| FeedError::Http(e.to_string()))
    }
}

// == Retry Policy ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            delay: RETRY_DELAY,
        }
    }
}

// == Load Result ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    LocalCache,
    Network { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub items: Vec<ActionItem>,
    pub origin: LoadOrigin,
}

#[derive(Error, Debug)]
pub enum LoadError {
    /// Every attempt failed
    #[error("failed to load presidential actions after {attempts} attempts: {last}. {}", RETRY_HINT)]
    Exhausted { attempts: u32, last: FeedError },
}

// == Feed Loader ==
pub struct FeedLoader<S> {
    source: Arc<dyn FeedSource>,
    cache: LocalFeedCache<S>,
    policy: RetryPolicy,
}

impl<S: FeedStorage> FeedLoader<S> {
    pub fn new(source: Arc<dyn FeedSource>, cache: LocalFeedCache<S>) -> Self {
        Self::with_policy(source, cache, RetryPolicy::default())
    }

    pub fn with_policy(
        source: Arc<dyn FeedSource>,
        cache: LocalFeedCache<S>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            source,
            cache,
            policy,
        }
    }

    /// Fresh local items if any, otherwise a network load.
    pub async fn load(&self) -> Result<Loaded, LoadError> {
        if let Some(items) = self.cache.read_fresh() {
            info!("Serving {} presidential actions from local cache", items.len());
            return Ok(Loaded {
                items,
                origin: LoadOrigin::LocalCache,
            });
        }
        self.load_from_network().await
    }

    /// Drops the local cache and loads from the network.
    pub async fn refresh(&self) -> Result<Loaded, LoadError> {
        if let Err(e) = self.cache.clear() {
            warn!("Could not clear local feed cache: {}", e);
        }
        self.load_from_network().await
    }

    async fn load_from_network(&self) -> Result<Loaded, LoadError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.fetch_once().await {
                Ok(items) => {
                    info!(
                        "Loaded {} presidential actions on attempt {}",
                        items.len(),
                        attempt
                    );
                    if let Err(e) = self.cache.write(&items) {
                        warn!("Could not write local feed cache: {}", e);
                    }
                    return Ok(Loaded {
                        items,
                        origin: LoadOrigin::Network { attempts: attempt },
                    });
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, max_attempts, e, self.policy.delay
                    );
                    tokio::time::sleep(self.policy.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Attempt {}/{} failed: {}", attempt, max_attempts, e);
                    return Err(LoadError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
            }
        }
    }

    async fn fetch_once(&self) -> Result<Vec<ActionItem>, FeedError> {
        let xml = self.source.fetch_feed().await?;
        extract(&xml)
    }

    pub fn cache(&self) -> &LocalFeedCache<S> {
        &self.cache
    }
}
