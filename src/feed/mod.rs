//! Feed Client Module
//!
//! Fetches the feed through the proxy, keeps the presidential actions and
//! remembers them locally for an hour.
//!
//! # Components
//! - `extract`: streaming RSS filter
//! - `local_cache`: timestamped item list in a small key-value file
//! - `loader`: cache-or-network load with fixed-backoff retries
//! - `search`: in-memory filtering of a loaded list

pub mod extract;
pub mod item;
pub mod loader;
pub mod local_cache;
pub mod search;

use thiserror::Error;

pub use extract::{extract, PRESIDENTIAL_ACTIONS_CATEGORY};
pub use item::ActionItem;
pub use loader::{
    FeedLoader, FeedSource, LoadError, LoadOrigin, Loaded, ProxyFeedSource, RetryPolicy,
    MAX_RETRIES, RETRY_DELAY,
};
pub use local_cache::{
    FeedStorage, FileStorage, LocalFeedCache, MemoryStorage, LOCAL_CACHE_TTL,
};

/// Feed requested when none is given.
pub const DEFAULT_FEED_URL: &str = "https://www.whitehouse.gov/feed/";

/// Hint appended to every client-side failure message.
pub const RETRY_HINT: &str = "Run again with --refresh to retry.";

// == Feed Error ==
/// Failure of a single fetch, parse or local storage operation.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Proxy could not be reached or the transfer broke off
    #[error("request failed: {0}")]
    Http(String),

    /// Proxy answered with a non-2xx status
    #[error("proxy returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Feed document is not well-formed
    #[error("malformed feed: {0}")]
    Xml(String),

    #[error("local storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("local storage holds invalid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}
