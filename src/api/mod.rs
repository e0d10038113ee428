//! API Module
//!
//! HTTP handlers and routing for the proxy server.
//!
//! # Endpoints
//! - `GET /proxy?url=...` - Proxy an allow-listed upstream URL
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Proxy counters

pub mod client;
pub mod handlers;
pub mod routes;

pub use client::ClientId;
pub use handlers::*;
pub use routes::create_router;
