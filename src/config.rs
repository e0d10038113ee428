//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::admission::RateLimitConfig;

/// CORS origins the proxy answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// `*`: any origin
    Any,
    /// Explicit list of origins
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Parses `*` or a comma-separated origin list.
    pub fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }
}

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Lifetime of cached upstream responses in seconds
    pub cache_ttl: u64,
    /// Requests admitted per client per window
    pub rate_limit_points: u64,
    /// Rate-limit window in seconds
    pub rate_limit_duration: u64,
    /// Block period in seconds after a client exceeds its budget
    pub rate_limit_block_duration: u64,
    /// CORS origins
    pub allowed_origins: AllowedOrigins,
    /// User-agent sent upstream
    pub user_agent: String,
    /// Upstream timeout in seconds
    pub upstream_timeout: u64,
    /// Shared store URL (`redis://...` or `memory://`)
    pub cache_store_url: String,
    /// Maximum keys held by the in-process store
    pub max_entries: usize,
    /// In-process store sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `CACHE_TTL` - Cache lifetime in seconds (default: 300)
    /// - `RATE_LIMIT_POINTS` - Requests per window (default: 100)
    /// - `RATE_LIMIT_DURATION` - Window in seconds (default: 60)
    /// - `RATE_LIMIT_BLOCK_DURATION` - Block in seconds (default: 300)
    /// - `ALLOWED_ORIGINS` - `*` or comma-separated origins (default: `*`)
    /// - `UPSTREAM_USER_AGENT` - Outbound user-agent
    /// - `UPSTREAM_TIMEOUT` - Outbound timeout in seconds (default: 5)
    /// - `CACHE_STORE_URL` - Store URL (default: `redis://127.0.0.1:6379`)
    /// - `MAX_ENTRIES` - In-process store capacity (default: 1000)
    /// - `CLEANUP_INTERVAL` - In-process sweep interval in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: parse_env("PORT", defaults.server_port),
            cache_ttl: parse_env("CACHE_TTL", defaults.cache_ttl),
            rate_limit_points: parse_env("RATE_LIMIT_POINTS", defaults.rate_limit_points),
            rate_limit_duration: parse_env("RATE_LIMIT_DURATION", defaults.rate_limit_duration),
            rate_limit_block_duration: parse_env(
                "RATE_LIMIT_BLOCK_DURATION",
                defaults.rate_limit_block_duration,
            ),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| AllowedOrigins::parse(&v))
                .unwrap_or(defaults.allowed_origins),
            user_agent: env::var("UPSTREAM_USER_AGENT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.user_agent),
            upstream_timeout: parse_env("UPSTREAM_TIMEOUT", defaults.upstream_timeout),
            cache_store_url: env::var("CACHE_STORE_URL").unwrap_or(defaults.cache_store_url),
            max_entries: parse_env("MAX_ENTRIES", defaults.max_entries),
            cleanup_interval: parse_env("CLEANUP_INTERVAL", defaults.cleanup_interval),
        }
    }

    /// Cache lifetime as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    /// Upstream timeout as a Duration.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    /// Admission budget derived from the rate-limit settings.
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            points: self.rate_limit_points,
            duration: Duration::from_secs(self.rate_limit_duration),
            block_duration: Duration::from_secs(self.rate_limit_block_duration),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache_ttl: 300,
            rate_limit_points: 100,
            rate_limit_duration: 60,
            rate_limit_block_duration: 300,
            allowed_origins: AllowedOrigins::Any,
            user_agent: format!("PresidentialActionsProxy/{}", env!("CARGO_PKG_VERSION")),
            upstream_timeout: 5,
            cache_store_url: "redis://127.0.0.1:6379".to_string(),
            max_entries: 1000,
            cleanup_interval: 60,
        }
    }
}

fn parse_env<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache_ttl, 300);
        assert_eq!(config.rate_limit(), RateLimitConfig::default());
        assert_eq!(config.upstream_timeout(), Duration::from_secs(5));
        assert_eq!(config.allowed_origins, AllowedOrigins::Any);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "PORT",
            "CACHE_TTL",
            "RATE_LIMIT_POINTS",
            "RATE_LIMIT_DURATION",
            "RATE_LIMIT_BLOCK_DURATION",
            "ALLOWED_ORIGINS",
            "UPSTREAM_USER_AGENT",
            "UPSTREAM_TIMEOUT",
            "CACHE_STORE_URL",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.rate_limit_points, 100);
        assert_eq!(config.rate_limit_duration, 60);
        assert_eq!(config.rate_limit_block_duration, 300);
        assert_eq!(config.cache_store_url, "redis://127.0.0.1:6379");
        assert!(config.user_agent.starts_with("PresidentialActionsProxy/"));
    }

    #[test]
    fn test_allowed_origins_parse() {
        assert_eq!(AllowedOrigins::parse("*"), AllowedOrigins::Any);
        assert_eq!(AllowedOrigins::parse(""), AllowedOrigins::Any);
        assert_eq!(
            AllowedOrigins::parse("https://a.example, https://b.example ,"),
            AllowedOrigins::List(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
    }
}
