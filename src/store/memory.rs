//! In-process Store Module
//!
//! HashMap-backed store with TTL expiry and a bounded entry count.
//! Every read-modify-write runs under a single write guard, which makes
//! `increment_with_window` atomic per key.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::entry::{current_timestamp_ms, Payload, StoredValue};
use super::{KvStore, StoreError, StoreUsage, WindowCount, PINNED_KEY_PREFIX};

// == Memory Store ==
/// In-process store shared by cloning.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Slots>>,
}

#[derive(Debug)]
struct Slots {
    /// Key-value storage
    entries: HashMap<String, StoredValue>,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl Slots {
    // == Make Room ==
    /// Frees a slot for `key` if the evictable entries are at capacity.
    ///
    /// Only cached byte values count toward capacity and only they are
    /// evicted: counters and keys under `PINNED_KEY_PREFIX` stay until they
    /// expire. Expired entries go first; if none are expired, the evictable
    /// entry closest to its expiry is removed.
    fn make_room(&mut self, key: &str) {
        if key.starts_with(PINNED_KEY_PREFIX) || self.entries.contains_key(key) {
            return;
        }
        if self.evictable_len() < self.max_entries {
            return;
        }

        self.purge_expired(current_timestamp_ms());
        if self.evictable_len() < self.max_entries {
            return;
        }

        let victim = self
            .entries
            .iter()
            .filter(|(k, slot)| is_evictable(k, slot))
            .min_by_key(|(_, slot)| slot.expires_at)
            .map(|(k, _)| k.clone());

        if let Some(victim) = victim {
            debug!("Store full, evicting {}", victim);
            self.entries.remove(&victim);
        }
    }

    fn evictable_len(&self) -> usize {
        self.entries
            .iter()
            .filter(|(k, slot)| is_evictable(k, slot))
            .count()
    }

    fn purge_expired(&mut self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, slot| !slot.is_expired_at(now_ms));
        before - self.entries.len()
    }
}

fn is_evictable(key: &str, slot: &StoredValue) -> bool {
    !key.starts_with(PINNED_KEY_PREFIX) && matches!(slot.payload, Payload::Bytes(_))
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store caching at most `max_entries` byte values.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Slots {
                entries: HashMap::new(),
                max_entries: max_entries.max(1),
            })),
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut slots = self.inner.write().await;
        slots.purge_expired(current_timestamp_ms())
    }

    // == Length ==
    /// Number of keys currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the store holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut slots = self.inner.write().await;

        match slots.entries.get(key) {
            Some(slot) if slot.is_expired() => {
                slots.entries.remove(key);
                Ok(None)
            }
            Some(slot) => Ok(Some(slot.to_bytes())),
            None => Ok(None),
        }
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut slots = self.inner.write().await;
        slots.make_room(key);
        slots
            .entries
            .insert(key.to_string(), StoredValue::bytes(value, ttl));
        Ok(())
    }

    async fn increment_with_window(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, StoreError> {
        let mut slots = self.inner.write().await;
        let now = current_timestamp_ms();

        if let Some(slot) = slots.entries.get_mut(key) {
            if !slot.is_expired_at(now) {
                if let Payload::Counter(count) = &mut slot.payload {
                    *count += 1;
                    return Ok(WindowCount {
                        count: *count,
                        resets_in: slot.remaining_at(now),
                    });
                }
                return Err(StoreError::Corrupt {
                    key: key.to_string(),
                    reason: "value is not a counter".to_string(),
                });
            }
        }

        slots.make_room(key);
        let slot = StoredValue::counter(window);
        let resets_in = slot.remaining_at(now);
        slots.entries.insert(key.to_string(), slot);

        Ok(WindowCount {
            count: 1,
            resets_in,
        })
    }

    async fn usage(&self) -> Option<StoreUsage> {
        let slots = self.inner.read().await;
        let bytes = slots
            .entries
            .iter()
            .map(|(key, slot)| key.len() + slot.size_bytes())
            .sum();

        Some(StoreUsage {
            entries: slots.entries.len(),
            approx_bytes: Some(bytes),
        })
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
