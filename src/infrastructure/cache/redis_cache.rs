//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, info, trace};

/// Redis cache for URL lookups and click counters.
///
/// Uses `ConnectionManager` for automatic reconnection; each call clones the
/// manager, which shares one multiplexed connection.
#[derive(Clone)]
pub struct RedisCache {
    client: ConnectionManager,
}

/// Classifies a Redis failure as a timeout or a generic operation error.
fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        CacheError::Timeout(message)
    } else if err.is_connection_dropped() || err.is_connection_refusal() {
        CacheError::Connection(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url)
            .map_err(|e| CacheError::Connection(format!("Failed to create Redis client: {e}")))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {e}")))?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::Connection(format!("Redis PING failed: {e}")))?;

        info!("Connected to Redis");

        Ok(Self { client: manager })
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.client.clone();

        let value = conn
            .get::<_, Option<String>>(key)
            .await
            .map_err(|e| map_redis_error("GET failed", e))?;

        trace!(key, hit = value.is_some(), "Redis GET");
        Ok(value)
    }

    async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.client.clone();

        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("MGET failed", e))?;

        if values.len() != keys.len() {
            return Err(CacheError::InvalidData(format!(
                "MGET returned {} values for {} keys",
                values.len(),
                keys.len()
            )));
        }

        Ok(values)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()> {
        let mut conn = self.client.clone();

        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .map_err(|e| map_redis_error("SET EX failed", e))?;

        debug!(key, ttl_seconds, "Redis SET");
        Ok(())
    }

    async fn increment(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.client.clone();

        conn.incr::<_, _, i64>(key, 1)
            .await
            .map_err(|e| map_redis_error("INCR failed", e))
    }

    async fn decrement_by(&self, key: &str, amount: i64) -> CacheResult<i64> {
        let mut conn = self.client.clone();

        conn.decr::<_, _, i64>(key, amount)
            .await
            .map_err(|e| map_redis_error("DECRBY failed", e))
    }

    async fn scan_keys(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> CacheResult<(u64, Vec<String>)> {
        let mut conn = self.client.clone();

        let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("SCAN failed", e))?;

        trace!(pattern, cursor, next_cursor, found = keys.len(), "Redis SCAN");
        Ok((next_cursor, keys))
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
