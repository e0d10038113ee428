//! Response DTOs for the proxy API
//!
//! Defines the structure of outgoing JSON response bodies.

use serde::Serialize;

use crate::error::ErrorKind;
use crate::proxy::StatsSnapshot;
use crate::store::StoreUsage;

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Seconds since the server started
    pub uptime: u64,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Store footprint, when the backend can report it
    pub memory_usage: MemoryUsage,
}

/// Store footprint reported by `/health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    /// Store backend name
    pub backend: String,
    /// Keys held
    pub entries: Option<usize>,
    /// Approximate value bytes held
    pub approx_bytes: Option<usize>,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(uptime: u64, backend: &str, usage: Option<StoreUsage>) -> Self {
        Self {
            status: "healthy".to_string(),
            uptime,
            timestamp: chrono::Utc::now().to_rfc3339(),
            memory_usage: MemoryUsage {
                backend: backend.to_string(),
                entries: usage.map(|u| u.entries),
                approx_bytes: usage.and_then(|u| u.approx_bytes),
            },
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a counter snapshot
    pub fn new(counters: StatsSnapshot) -> Self {
        Self {
            hit_rate: counters.hit_rate(),
            counters,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Stable error kind
    pub error: ErrorKind,
    /// Human-readable description
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
        }
    }
}
