//! Cache-aside proxy
//!
//! Looks up the canonical URL in the shared store, answers from cache while
//! the entry is fresh, otherwise fetches upstream and writes the result back.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use super::cache::{cache_key, CacheEntry};
use super::stats::ProxyStats;
use super::upstream::Upstream;
use crate::error::Result;
use crate::store::KvStore;

// == Cache Status ==
/// Where a proxied response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Value of the `X-Cache` response header.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

// == Proxied Response ==
/// Body and content-type returned to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxiedResponse {
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache: CacheStatus,
}

// == Proxy Service ==
/// Cache-aside proxy over a shared store and an upstream fetcher.
#[derive(Clone)]
pub struct ProxyService {
    store: Arc<dyn KvStore>,
    upstream: Arc<dyn Upstream>,
    cache_ttl: Duration,
    stats: Arc<ProxyStats>,
}

impl ProxyService {
    pub fn new(
        store: Arc<dyn KvStore>,
        upstream: Arc<dyn Upstream>,
        cache_ttl: Duration,
        stats: Arc<ProxyStats>,
    ) -> Self {
        Self {
            store,
            upstream,
            cache_ttl,
            stats,
        }
    }

    /// Serves `url` from cache or upstream. `url` must already be canonical
    /// and allow-listed.
    pub async fn proxy(&self, url: &Url) -> Result<ProxiedResponse> {
        let key = cache_key(url);

        if let Some(entry) = self.lookup(&key).await {
            debug!("Cache hit for {}", url);
            self.stats.record_hit();
            return Ok(ProxiedResponse {
                body: entry.body,
                content_type: entry.content_type,
                cache: CacheStatus::Hit,
            });
        }

        self.stats.record_miss();
        self.stats.record_upstream_fetch();

        let fetched = match self.upstream.fetch(url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                self.stats.record_upstream_failure();
                return Err(e);
            }
        };

        let entry = CacheEntry::new(fetched.body, fetched.content_type);
        if let Err(e) = self
            .store
            .set_with_expiry(&key, entry.encode(), self.cache_ttl)
            .await
        {
            warn!("Cache write failed for {}: {}", url, e);
        } else {
            info!("Cached {} ({} bytes)", url, entry.body.len());
        }

        Ok(ProxiedResponse {
            body: entry.body,
            content_type: entry.content_type,
            cache: CacheStatus::Miss,
        })
    }

    /// Fresh entry for `key`, if any. Store failures read as a miss.
    async fn lookup(&self, key: &str) -> Option<CacheEntry> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read failed, treating as miss: {}", e);
                return None;
            }
        };

        match CacheEntry::decode(key, &raw) {
            Ok(entry) if entry.is_fresh(self.cache_ttl) => Some(entry),
            Ok(_) => {
                debug!("Stale cache entry for {}", key);
                None
            }
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Counters shared with the stats endpoint.
    pub fn stats(&self) -> &Arc<ProxyStats> {
        &self.stats
    }

    /// Backing store, shared with admission control and health reporting.
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }
}
