//! In-process cache implementation.

use super::service::{CacheError, CacheResult, CacheService};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// A cache held in process memory.
///
/// Used when Redis is not configured or unreachable at startup, and as the
/// cache in tests. Counters live only as long as the process; pair it with
/// [`crate::domain::reconciliation_worker::CounterMode::Delta`] so durable
/// totals survive a restart. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryCache {
    /// Creates an empty in-process cache.
    pub fn new() -> Self {
        debug!("Using in-process cache");
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds `delta` to the integer at `key`, treating a missing or expired key as `0`.
    fn add(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let mut entry = self.entries.entry(key.to_string()).or_insert(Entry {
            value: "0".to_string(),
            expires_at: None,
        });

        if entry.is_expired() {
            entry.value = "0".to_string();
            entry.expires_at = None;
        }

        let current: i64 = entry.value.parse().map_err(|_| {
            CacheError::InvalidData(format!("value at {key} is not an integer"))
        })?;
        let next = current.checked_add(delta).ok_or_else(|| {
            CacheError::InvalidData(format!("increment or decrement at {key} would overflow"))
        })?;
        entry.value = next.to_string();

        Ok(next)
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }
}

/// Matches `key` against a glob supporting `*` and `?`.
fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == key[k]) {
            p += 1;
            k += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, k));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            k = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.live_value(key))
    }

    async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>> {
        Ok(keys.iter().map(|key| self.live_value(key)).collect())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_seconds)),
            },
        );
        Ok(())
    }

    async fn increment(&self, key: &str) -> CacheResult<i64> {
        self.add(key, 1)
    }

    async fn decrement_by(&self, key: &str, amount: i64) -> CacheResult<i64> {
        let delta = amount.checked_neg().ok_or_else(|| {
            CacheError::InvalidData(format!("cannot decrement {key} by {amount}"))
        })?;
        self.add(key, delta)
    }

    async fn scan_keys(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> CacheResult<(u64, Vec<String>)> {
        // Expired entries are otherwise only dropped when read.
        self.entries.retain(|_, entry| !entry.is_expired());

        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| glob_match(pattern, e.key()))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();

        let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(keys.len());
        let end = start.saturating_add(count.max(1)).min(keys.len());
        let next_cursor = if end >= keys.len() { 0 } else { end as u64 };

        Ok((next_cursor, keys[start..end].to_vec()))
    }

    async fn health_check(&self) -> bool {
        true
    }
}
