//! Cache service trait and error types.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache operation error: {0}")]
    Operation(String),
    #[error("cache value is invalid: {0}")]
    InvalidData(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Key-value cache with expiry and atomic counters.
///
/// Backs both the `url:{code}` lookup entries and the `clicks:{code}` counters
/// (see [`crate::domain::cache_keys`]). Implementations return errors instead of
/// hiding them; callers on the redirect path decide how to degrade.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process cache
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Returns the value stored at `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Returns the values of several keys, in the same order as `keys`.
    async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>>;

    /// Stores `value` at `key`, expiring after `ttl_seconds`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()>;

    /// Atomically increments the integer at `key` by one and returns the new value.
    ///
    /// A missing key counts from zero.
    async fn increment(&self, key: &str) -> CacheResult<i64>;

    /// Atomically subtracts `amount` from the integer at `key` and returns the new value.
    async fn decrement_by(&self, key: &str, amount: i64) -> CacheResult<i64>;

    /// Returns one page of keys matching a glob `pattern`.
    ///
    /// Start with `cursor = 0`; the iteration is complete when the returned
    /// cursor is `0`. `count` is a hint for the page size. Keys created or
    /// removed during an iteration may or may not be returned, and a key may
    /// be returned more than once.
    async fn scan_keys(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> CacheResult<(u64, Vec<String>)>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}
