//! Actions Proxy - caching, rate-limited proxy for the White House feed
//!
//! Serves allow-listed upstream URLs through a shared response cache behind
//! per-client admission control, and ships a feed client that extracts
//! presidential actions from the proxied RSS feed.

pub mod admission;
pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod proxy;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
