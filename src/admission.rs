//! Admission Control
//!
//! Per-client request budget. A client may make `points` requests per
//! window; the request that exceeds the budget blocks the client for
//! `block_duration`, regardless of when the window itself resets.
//! Counters live in the shared store, so every proxy instance sees the
//! same budget.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::error::{AppError, Result};
use crate::store::{current_timestamp_ms, duration_ms, KvStore};

const COUNT_KEY_PREFIX: &str = "ratelimit:count:";
const BLOCK_KEY_PREFIX: &str = "ratelimit:block:";

// == Rate Limit Config ==
/// Budget applied to every client identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests admitted per window
    pub points: u64,
    /// Window length
    pub duration: Duration,
    /// How long a client stays refused after exceeding the budget
    pub block_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            points: 100,
            duration: Duration::from_secs(60),
            block_duration: Duration::from_secs(300),
        }
    }
}

/// Outcome of a successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Requests left in the current window
    pub remaining: u64,
    /// Time until the current window resets, sent as `X-RateLimit-Reset`
    pub resets_in: Duration,
}

// == Rate Limiter ==
/// Fixed-window limiter with a separate block period.
///
/// Fails closed: if the store cannot be reached, requests are refused.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KvStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KvStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admits or rejects one request from `client_id`.
    pub async fn admit(&self, client_id: &str) -> Result<Admission> {
        let block_key = format!("{}{}", BLOCK_KEY_PREFIX, client_id);
        let count_key = format!("{}{}", COUNT_KEY_PREFIX, client_id);

        let blocked = self.store.get(&block_key).await.map_err(|e| {
            error!("Admission store unavailable, refusing {}: {}", client_id, e);
            AppError::from(e)
        })?;
        if let Some(raw) = blocked {
            return Err(AppError::RateLimited {
                retry_after_secs: retry_after_from_block(&raw, self.config.block_duration),
            });
        }

        let window = self
            .store
            .increment_with_window(&count_key, self.config.duration)
            .await
            .map_err(|e| {
                error!("Admission store unavailable, refusing {}: {}", client_id, e);
                AppError::from(e)
            })?;

        if window.count <= self.config.points {
            return Ok(Admission {
                remaining: self.config.points - window.count,
                resets_in: window.resets_in,
            });
        }

        warn!(
            "Client {} exceeded {} requests per {:?}, blocking for {:?}",
            client_id, self.config.points, self.config.duration, self.config.block_duration
        );

        let blocked_until = current_timestamp_ms().saturating_add(duration_ms(self.config.block_duration));
        if let Err(e) = self
            .store
            .set_with_expiry(
                &block_key,
                blocked_until.to_string().into_bytes(),
                self.config.block_duration,
            )
            .await
        {
            error!("Failed to record block for {}: {}", client_id, e);
        }

        Err(AppError::RateLimited {
            retry_after_secs: ceil_secs(self.config.block_duration),
        })
    }
}

/// Seconds left in a block, read from the stored blocked-until timestamp.
fn retry_after_from_block(raw: &[u8], block_duration: Duration) -> u64 {
    let until = std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok());

    match until {
        Some(until) => ceil_secs(Duration::from_millis(
            until.saturating_sub(current_timestamp_ms()),
        ))
        .max(1),
        None => ceil_secs(block_duration),
    }
}

/// Whole seconds, rounded up.
pub fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
