//! Fire-and-forget click counting.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{trace, warn};

use crate::domain::cache_keys::clicks_key;
use crate::infrastructure::cache::CacheService;

/// Increments the `clicks:{code}` counter for every successful redirect.
///
/// The durable store is never touched here; counters are folded into it by
/// [`crate::domain::reconciliation_worker::ReconciliationWorker`].
#[derive(Clone)]
pub struct ClickRecorder {
    cache: Arc<dyn CacheService>,
    cache_timeout: Duration,
}

impl ClickRecorder {
    /// Creates a recorder writing to `cache`, giving up on a single increment
    /// after `cache_timeout`.
    pub fn new(cache: Arc<dyn CacheService>, cache_timeout: Duration) -> Self {
        Self {
            cache,
            cache_timeout,
        }
    }

    /// Counts one click for `code` on a background task.
    ///
    /// Returns immediately; failures are logged and dropped. The handle is
    /// only useful to callers that need to wait for the increment.
    pub fn record_click(&self, code: &str) -> JoinHandle<()> {
        let recorder = self.clone();
        let code = code.to_string();

        tokio::spawn(async move { recorder.increment(&code).await })
    }

    async fn increment(&self, code: &str) {
        let key = clicks_key(code);

        match timeout(self.cache_timeout, self.cache.increment(&key)).await {
            Ok(Ok(count)) => {
                trace!(code, count, "Click recorded");
                metrics::counter!("clicks_recorded_total").increment(1);
            }
            Ok(Err(e)) => {
                warn!(code, error = %e, "Failed to record click");
                metrics::counter!("click_record_failures_total").increment(1);
            }
            Err(_) => {
                warn!(code, "Timed out recording click");
                metrics::counter!("click_record_failures_total").increment(1);
            }
        }
    }
}
