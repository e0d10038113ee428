//! Local freshness cache
//!
//! Persists the last fetched item list and its timestamp under two fixed
//! keys of a small key-value storage. Both keys are written and cleared
//! together.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, warn};

use super::item::ActionItem;
use super::FeedError;
use crate::store::{current_timestamp_ms, duration_ms};

/// Key holding the serialized item list.
pub const ITEMS_KEY: &str = "presidentialActions";

/// Key holding the write timestamp (Unix milliseconds).
pub const TIMESTAMP_KEY: &str = "presidentialActionsTimestamp";

/// How long a stored list stays fresh.
pub const LOCAL_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

// == Feed Storage ==
/// String key-value storage used by the local cache.
pub trait FeedStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, FeedError>;
    fn set(&self, key: &str, value: &str) -> Result<(), FeedError>;
    fn remove(&self, key: &str) -> Result<(), FeedError>;
}

/// Storage kept in a single JSON object on disk.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, FeedError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), FeedError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl FeedStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, FeedError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FeedError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), FeedError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Storage held in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FeedStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, FeedError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FeedError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), FeedError> {
        self.lock().remove(key);
        Ok(())
    }
}

// == Local Feed Cache ==
/// Item list plus timestamp, fresh while younger than the TTL.
#[derive(Debug)]
pub struct LocalFeedCache<S> {
    storage: S,
    ttl: Duration,
}

impl<S: FeedStorage> LocalFeedCache<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            ttl: LOCAL_CACHE_TTL,
        }
    }

    /// Stored items, if present and fresh.
    ///
    /// Unreadable or inconsistent state reads as absent.
    pub fn read_fresh(&self) -> Option<Vec<ActionItem>> {
        self.read_fresh_at(current_timestamp_ms())
    }

    /// Freshness check against an explicit time.
    pub fn read_fresh_at(&self, now_ms: u64) -> Option<Vec<ActionItem>> {
        let (items, timestamp) = match (self.storage.get(ITEMS_KEY), self.storage.get(TIMESTAMP_KEY)) {
            (Ok(Some(items)), Ok(Some(timestamp))) => (items, timestamp),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Local feed cache unreadable: {}", e);
                return None;
            }
            _ => return None,
        };

        let timestamp: u64 = match timestamp.trim().parse() {
            Ok(ts) => ts,
            Err(_) => {
                warn!("Local feed cache has an invalid timestamp {:?}", timestamp);
                return None;
            }
        };

        if now_ms.saturating_sub(timestamp) >= duration_ms(self.ttl) {
            debug!("Local feed cache expired");
            return None;
        }

        match serde_json::from_str(&items) {
            Ok(items) => Some(items),
            Err(e) => {
                warn!("Local feed cache holds malformed items: {}", e);
                None
            }
        }
    }

    /// Replaces the stored list and stamps it with the current time.
    pub fn write(&self, items: &[ActionItem]) -> Result<(), FeedError> {
        self.write_at(items, current_timestamp_ms())
    }

    pub fn write_at(&self, items: &[ActionItem], now_ms: u64) -> Result<(), FeedError> {
        self.storage.set(ITEMS_KEY, &serde_json::to_string(items)?)?;
        self.storage.set(TIMESTAMP_KEY, &now_ms.to_string())
    }

    /// Removes both keys.
    pub fn clear(&self) -> Result<(), FeedError> {
        self.storage.remove(ITEMS_KEY)?;
        self.storage.remove(TIMESTAMP_KEY)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}
