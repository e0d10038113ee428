//! Store Module
//!
//! Key-value store abstraction shared by the response cache and the rate
//! limiter. Production runs against Redis; the in-process store backs tests
//! and serves as a degraded fallback when Redis cannot be reached at startup.

mod entry;
mod memory;
mod redis;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub use entry::{current_timestamp_ms, duration_ms, Payload, StoredValue};
pub use memory::MemoryStore;
pub use self::redis::RedisStore;

// == Public Constants ==
/// URL scheme selecting the in-process store.
pub const MEMORY_SCHEME: &str = "memory://";

/// Keys under this prefix hold admission state and are never evicted to
/// make room for cached responses.
pub const PINNED_KEY_PREFIX: &str = "ratelimit:";

// == Store Error ==
/// Failures raised by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend cannot be reached or refused the command
    #[error("store unreachable: {0}")]
    Unavailable(String),

    /// A stored value could not be decoded
    #[error("corrupt value for key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

// == Window Count ==
/// Result of an increment inside a counting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Value of the counter after the increment
    pub count: u64,
    /// Time left until the window resets
    pub resets_in: Duration,
}

// == Store Usage ==
/// Approximate footprint reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreUsage {
    /// Number of keys currently held
    pub entries: usize,
    /// Bytes held by values, when the backend can tell
    pub approx_bytes: Option<usize>,
}

// == KvStore Trait ==
/// Minimal store interface: get, set with expiry, windowed increment.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the value for `key`, or None when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value, for `ttl`.
    async fn set_with_expiry(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Atomically increments the counter at `key`.
    ///
    /// The first increment opens a window of length `window`; the counter
    /// disappears once the window has elapsed.
    async fn increment_with_window(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, StoreError>;

    /// Approximate footprint, if the backend can report it.
    async fn usage(&self) -> Option<StoreUsage> {
        None
    }

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

// == Open ==
/// A store selected from configuration.
pub enum OpenedStore {
    Redis(RedisStore),
    Memory(MemoryStore),
}

/// Opens the store named by `url`.
///
/// `memory://` selects the in-process store. Any other URL is handed to the
/// Redis client; if it cannot connect, the in-process store is used instead
/// and a warning is logged.
pub async fn open(url: &str, max_entries: usize) -> OpenedStore {
    if url.trim().is_empty() || url.starts_with(MEMORY_SCHEME) {
        info!("Using in-process store (max_entries={})", max_entries);
        return OpenedStore::Memory(MemoryStore::new(max_entries));
    }

    match RedisStore::connect(url).await {
        Ok(store) => OpenedStore::Redis(store),
        Err(e) => {
            warn!(
                "Could not connect to shared store ({}); falling back to in-process store",
                e
            );
            OpenedStore::Memory(MemoryStore::new(max_entries))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_scheme() {
        let opened = open("memory://", 10).await;
        assert!(matches!(opened, OpenedStore::Memory(_)));
    }

    #[tokio::test]
    async fn test_open_empty_url_uses_memory() {
        let opened = open("", 10).await;
        assert!(matches!(opened, OpenedStore::Memory(_)));
    }

    #[tokio::test]
    async fn test_open_invalid_url_falls_back() {
        let opened = open("not-a-redis-url", 10).await;
        assert!(matches!(opened, OpenedStore::Memory(_)));
    }
}
