//! Response Cache Module
//!
//! Cached upstream responses keyed by canonical URL, stored in the shared
//! store as JSON with a base64 body.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::store::{current_timestamp_ms, duration_ms, StoreError};

// == Public Constants ==
/// Prefix for cache keys in the shared store.
pub const CACHE_KEY_PREFIX: &str = "proxy:cache:";

// == Cache Entry ==
/// A cached upstream response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Raw upstream body
    #[serde(with = "base64_body")]
    pub body: Vec<u8>,
    /// Upstream content-type, preserved verbatim
    pub content_type: String,
    /// When the entry was written (Unix milliseconds)
    pub stored_at: u64,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(body: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            body,
            content_type: content_type.into(),
            stored_at: current_timestamp_ms(),
        }
    }

    /// True while `stored_at + ttl` lies in the future.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        current_timestamp_ms() < self.stored_at.saturating_add(duration_ms(ttl))
    }

    /// Serializes the entry for the store.
    pub fn encode(&self) -> Vec<u8> {
        // Serializing a plain struct of strings and integers cannot fail
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decodes an entry read from the store.
    pub fn decode(key: &str, raw: &[u8]) -> Result<Self, StoreError> {
        serde_json::from_slice(raw).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Store key for a canonical upstream URL.
pub fn cache_key(url: &Url) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, url.as_str())
}

mod base64_body {
    use super::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
