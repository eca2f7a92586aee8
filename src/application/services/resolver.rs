//! Cache-aside resolution of short codes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::cache_keys::url_key;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheError, CacheService};

/// Tuning for [`Resolver`].
#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    /// TTL of populated `url:{code}` entries.
    pub cache_ttl_seconds: u64,
    /// Upper bound on a single cache call.
    pub cache_timeout: Duration,
    /// Upper bound on a single durable store call.
    pub store_timeout: Duration,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 86_400,
            cache_timeout: Duration::from_millis(200),
            store_timeout: Duration::from_secs(2),
        }
    }
}

/// Resolves short codes to target URLs, cache first.
///
/// # Algorithm
///
/// 1. Read `url:{code}` from the cache; a hit returns without touching the store
/// 2. On miss, read the record from the durable store
/// 3. Absent record: [`AppError::NotFound`], nothing is cached
/// 4. Present record: populate the cache (best-effort) and return the target
///
/// Cache errors and timeouts count as misses. A durable store timeout is
/// reported as [`AppError::Unavailable`].
pub struct Resolver {
    cache: Arc<dyn CacheService>,
    link_repository: Arc<dyn LinkRepository>,
    options: ResolverOptions,
}

impl Resolver {
    /// Creates a new resolver.
    pub fn new(
        cache: Arc<dyn CacheService>,
        link_repository: Arc<dyn LinkRepository>,
        options: ResolverOptions,
    ) -> Self {
        Self {
            cache,
            link_repository,
            options,
        }
    }

    /// Returns the target URL for `code`.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if no record has this code
    /// - [`AppError::Unavailable`] if the durable store timed out
    /// - [`AppError::Internal`] on other durable store failures
    pub async fn resolve(&self, code: &str) -> Result<String, AppError> {
        let key = url_key(code);

        match self.bounded_cache_call(self.cache.get(&key)).await {
            Ok(Some(target_url)) => {
                debug!(code, "Cache HIT");
                metrics::counter!("cache_hits_total").increment(1);
                return Ok(target_url);
            }
            Ok(None) => {
                debug!(code, "Cache MISS");
                metrics::counter!("cache_misses_total").increment(1);
            }
            Err(e) => {
                warn!(code, error = %e, "Cache read failed, falling back to database");
                metrics::counter!("cache_errors_total").increment(1);
            }
        }

        let link = timeout(
            self.options.store_timeout,
            self.link_repository.find_by_code(code),
        )
        .await
        .map_err(|_| {
            AppError::unavailable(
                "Database lookup timed out",
                json!({ "code": code, "timeout_ms": self.options.store_timeout.as_millis() as u64 }),
            )
        })??
        .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))?;

        if let Err(e) = self
            .bounded_cache_call(self.cache.set_with_ttl(
                &key,
                &link.target_url,
                self.options.cache_ttl_seconds,
            ))
            .await
        {
            warn!(code, error = %e, "Failed to populate cache");
            metrics::counter!("cache_errors_total").increment(1);
        }

        Ok(link.target_url)
    }

    /// Runs a cache call under the configured timeout.
    async fn bounded_cache_call<T>(
        &self,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        timeout(self.options.cache_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(CacheError::Timeout(format!(
                    "no reply within {}ms",
                    self.options.cache_timeout.as_millis()
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ClickTotal, Link};
    use crate::domain::repositories::MockLinkRepository;
    use crate::infrastructure::cache::{MemoryCache, MockCacheService};
    use async_trait::async_trait;
    use chrono::Utc;

    fn test_link(code: &str, url: &str) -> Link {
        Link::new(110_237, code.to_string(), url.to_string(), Utc::now(), 0)
    }

    /// A cache whose every call hangs past any timeout.
    struct StalledCache;

    #[async_trait]
    impl CacheService for StalledCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            std::future::pending().await
        }

        async fn get_many(&self, _keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
            std::future::pending().await
        }

        async fn set_with_ttl(&self, _key: &str, _value: &str, _ttl: u64) -> Result<(), CacheError> {
            std::future::pending().await
        }

        async fn increment(&self, _key: &str) -> Result<i64, CacheError> {
            std::future::pending().await
        }

        async fn decrement_by(&self, _key: &str, _amount: i64) -> Result<i64, CacheError> {
            std::future::pending().await
        }

        async fn scan_keys(
            &self,
            _pattern: &str,
            _cursor: u64,
            _count: usize,
        ) -> Result<(u64, Vec<String>), CacheError> {
            std::future::pending().await
        }

        async fn health_check(&self) -> bool {
            false
        }
    }

    /// A durable store whose lookups never complete.
    struct StalledRepository;

    #[async_trait]
    impl LinkRepository for StalledRepository {
        async fn create(&self, _target_url: &str) -> Result<Link, AppError> {
            std::future::pending().await
        }

        async fn find_by_code(&self, _code: &str) -> Result<Option<Link>, AppError> {
            std::future::pending().await
        }

        async fn set_click_totals(&self, _totals: &[ClickTotal]) -> Result<u64, AppError> {
            std::future::pending().await
        }

        async fn add_click_totals(&self, _deltas: &[ClickTotal]) -> Result<u64, AppError> {
            std::future::pending().await
        }

        async fn ping(&self) -> Result<(), AppError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_miss_populates_cache_and_hit_skips_database() {
        let mut mock_repo = MockLinkRepository::new();
        let link = test_link("sG1", "https://example.com");
        mock_repo
            .expect_find_by_code()
            .withf(|code| code == "sG1")
            .times(1)
            .returning(move |_| Ok(Some(link.clone())));

        let cache = MemoryCache::new();
        let resolver = Resolver::new(
            Arc::new(cache.clone()),
            Arc::new(mock_repo),
            ResolverOptions::default(),
        );

        assert_eq!(resolver.resolve("sG1").await.unwrap(), "https://example.com");
        assert_eq!(
            cache.get("url:sG1").await.unwrap(),
            Some("https://example.com".to_string())
        );

        // Second call is served from cache; the mock panics on a second lookup.
        assert_eq!(resolver.resolve("sG1").await.unwrap(), "https://example.com");
    }

    #[tokio::test]
    async fn test_not_found_caches_nothing() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_find_by_code()
            .times(1)
            .returning(|_| Ok(None));

        let cache = MemoryCache::new();
        let resolver = Resolver::new(
            Arc::new(cache.clone()),
            Arc::new(mock_repo),
            ResolverOptions::default(),
        );

        let result = resolver.resolve("zzzzz").await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cache_error_degrades_to_database() {
        let mut mock_cache = MockCacheService::new();
        mock_cache
            .expect_get()
            .times(1)
            .returning(|_| Err(CacheError::Connection("refused".to_string())));
        mock_cache
            .expect_set_with_ttl()
            .times(1)
            .returning(|_, _, _| Err(CacheError::Connection("refused".to_string())));

        let mut mock_repo = MockLinkRepository::new();
        let link = test_link("abc", "https://example.com/a");
        mock_repo
            .expect_find_by_code()
            .times(1)
            .returning(move |_| Ok(Some(link.clone())));

        let resolver = Resolver::new(
            Arc::new(mock_cache),
            Arc::new(mock_repo),
            ResolverOptions::default(),
        );

        assert_eq!(resolver.resolve("abc").await.unwrap(), "https://example.com/a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_timeout_degrades_to_database() {
        let mut mock_repo = MockLinkRepository::new();
        let link = test_link("abc", "https://example.com/a");
        mock_repo
            .expect_find_by_code()
            .times(1)
            .returning(move |_| Ok(Some(link.clone())));

        let resolver = Resolver::new(
            Arc::new(StalledCache),
            Arc::new(mock_repo),
            ResolverOptions::default(),
        );

        assert_eq!(resolver.resolve("abc").await.unwrap(), "https://example.com/a");
    }

    #[tokio::test]
    async fn test_ttl_is_passed_to_cache() {
        let mut mock_cache = MockCacheService::new();
        mock_cache.expect_get().returning(|_| Ok(None));
        mock_cache
            .expect_set_with_ttl()
            .withf(|key, value, ttl| key == "url:abc" && value == "https://t.example" && *ttl == 42)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut mock_repo = MockLinkRepository::new();
        let link = test_link("abc", "https://t.example");
        mock_repo
            .expect_find_by_code()
            .returning(move |_| Ok(Some(link.clone())));

        let resolver = Resolver::new(
            Arc::new(mock_cache),
            Arc::new(mock_repo),
            ResolverOptions {
                cache_ttl_seconds: 42,
                ..ResolverOptions::default()
            },
        );

        resolver.resolve("abc").await.unwrap();
    }

    #[tokio::test]
    async fn test_database_error_propagates() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_find_by_code()
            .times(1)
            .returning(|_| Err(AppError::internal("Database error", json!({}))));

        let resolver = Resolver::new(
            Arc::new(MemoryCache::new()),
            Arc::new(mock_repo),
            ResolverOptions::default(),
        );

        assert!(matches!(
            resolver.resolve("abc").await,
            Err(AppError::Internal { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_database_timeout_is_unavailable() {
        let cache = MemoryCache::new();
        let resolver = Resolver::new(
            Arc::new(cache.clone()),
            Arc::new(StalledRepository),
            ResolverOptions {
                store_timeout: Duration::from_millis(500),
                ..ResolverOptions::default()
            },
        );

        let started = tokio::time::Instant::now();
        let result = resolver.resolve("abc").await;

        assert!(matches!(result, Err(AppError::Unavailable { .. })));
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(cache.is_empty());
    }
}
