//! Stored Value Module
//!
//! Defines a single in-process store slot with its expiry.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Payload ==
/// What a slot holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Opaque bytes written by `set_with_expiry`
    Bytes(Vec<u8>),
    /// Counter maintained by `increment_with_window`
    Counter(u64),
}

// == Stored Value ==
/// A store slot: payload plus its expiry timestamp.
#[derive(Debug, Clone)]
pub struct StoredValue {
    /// The stored payload
    pub payload: Payload,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl StoredValue {
    // == Constructors ==
    /// Creates a byte slot living for `ttl`.
    pub fn bytes(value: Vec<u8>, ttl: Duration) -> Self {
        Self::with_payload(Payload::Bytes(value), ttl)
    }

    /// Creates a counter slot at 1 whose window lasts `window`.
    pub fn counter(window: Duration) -> Self {
        Self::with_payload(Payload::Counter(1), window)
    }

    fn with_payload(payload: Payload, ttl: Duration) -> Self {
        let now = current_timestamp_ms();
        Self {
            payload,
            expires_at: now.saturating_add(duration_ms(ttl)),
        }
    }

    // == Is Expired ==
    /// Checks if the slot has expired.
    ///
    /// A slot is expired once the current time reaches `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Expiry check against an explicit timestamp.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    // == Time To Live ==
    /// Remaining lifetime at `now_ms`, zero once expired.
    pub fn remaining_at(&self, now_ms: u64) -> Duration {
        Duration::from_millis(self.expires_at.saturating_sub(now_ms))
    }

    /// Returns the payload as bytes. Counters render as decimal text.
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.payload {
            Payload::Bytes(bytes) => bytes.clone(),
            Payload::Counter(count) => count.to_string().into_bytes(),
        }
    }

    /// Approximate bytes held by the payload.
    pub fn size_bytes(&self) -> usize {
        match &self.payload {
            Payload::Bytes(bytes) => bytes.len(),
            Payload::Counter(_) => std::mem::size_of::<u64>(),
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
