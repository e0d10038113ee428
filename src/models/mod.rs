//! Request and Response models for the proxy API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! parsing requests and serializing response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::ProxyQuery;
pub use responses::{ErrorResponse, HealthResponse, MemoryUsage, StatsResponse};
