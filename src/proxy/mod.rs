//! Proxy Module
//!
//! URL allow-listing, the cache-aside proxy and its upstream fetcher.

pub mod allowlist;
pub mod cache;
mod service;
mod stats;
pub mod upstream;

pub use allowlist::{canonicalize, is_allowed, ALLOWED_PATH_PREFIXES, UPSTREAM_HOST};
pub use cache::CacheEntry;
pub use service::{CacheStatus, ProxiedResponse, ProxyService};
pub use stats::{ProxyStats, StatsSnapshot};
pub use upstream::{HttpUpstream, Upstream, UpstreamResponse};
