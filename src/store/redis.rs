//! Redis Store Module
//!
//! Shared store backed by Redis. Uses a `ConnectionManager` for automatic
//! reconnection; the windowed increment runs as one Lua script so the
//! increment and the window expiry are applied atomically.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, RedisError, Script};
use tracing::{error, info};

use super::entry::duration_ms;
use super::{KvStore, StoreError, StoreUsage, WindowCount};

/// INCR plus PEXPIRE on the first hit. Returns `{count, pttl}`.
const INCREMENT_WINDOW_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
local ttl = redis.call('PTTL', KEYS[1])
if count == 1 or ttl < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
  ttl = tonumber(ARGV[1])
end
return {count, ttl}
"#;

// == Redis Store ==
/// Redis-backed store shared across proxy instances.
#[derive(Clone)]
pub struct RedisStore {
    conn_manager: ConnectionManager,
    increment_script: Arc<Script>,
    redis_url: String,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("redis_url", &self.redis_url)
            .field("conn_manager", &"<ConnectionManager>")
            .finish()
    }
}

impl From<RedisError> for StoreError {
    fn from(e: RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl RedisStore {
    /// Connects to the Redis server at `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to shared store at {}", redis_url);
        let client = redis::Client::open(redis_url)?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to create Redis ConnectionManager: {}", e);
            StoreError::from(e)
        })?;
        info!("Shared store connection established");

        Ok(Self {
            conn_manager,
            increment_script: Arc::new(Script::new(INCREMENT_WINDOW_SCRIPT)),
            redis_url: redis_url.to_string(),
        })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn_manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(duration_ms(ttl).max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn increment_with_window(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, StoreError> {
        let mut conn = self.conn_manager.clone();
        let (count, ttl_ms): (u64, i64) = self
            .increment_script
            .key(key)
            .arg(duration_ms(window).max(1))
            .invoke_async(&mut conn)
            .await?;

        Ok(WindowCount {
            count,
            resets_in: Duration::from_millis(ttl_ms.max(0) as u64),
        })
    }

    async fn usage(&self) -> Option<StoreUsage> {
        let mut conn = self.conn_manager.clone();
        let entries: usize = redis::cmd("DBSIZE").query_async(&mut conn).await.ok()?;
        Some(StoreUsage {
            entries,
            approx_bytes: None,
        })
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
