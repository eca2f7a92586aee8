//! Background reconciliation of cache-resident click counters.
//!
//! Every interval the worker walks all `clicks:*` counters in the cache and
//! overwrites the matching records' click totals in the durable store, in one
//! transaction per cycle.
//!
//! # Cycle
//!
//! ```text
//! Idle --tick--> Scanning --keys--> Flushing --commit/abort--> Idle
//! Idle --stop--> Stopped
//! ```
//!
//! With a shared cache ([`CounterMode::Cumulative`]) counters are never reset.
//! They hold the cumulative clicks for a code, so totals are written as
//! overwrites and repeating a cycle is harmless. A process-local cache starts
//! from zero after every restart, so [`CounterMode::Delta`] adds each counter
//! to the durable total and subtracts the flushed amount from the counter
//! after the commit. Either way a failed cycle commits nothing and leaves the
//! counters in place for the next tick.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::domain::cache_keys::{CLICKS_PATTERN, clicks_key, code_from_clicks_key};
use crate::domain::entities::ClickTotal;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheError, CacheService};

/// Lifecycle state of a [`ReconciliationWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Scanning,
    Flushing,
    Stopped,
}

/// What a `clicks:{code}` counter holds, which decides how it is flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterMode {
    /// All clicks ever recorded for the code; the counter outlives the process.
    /// Flushing overwrites the durable total.
    #[default]
    Cumulative,
    /// Clicks since the last flush in this process. Flushing adds the value to
    /// the durable total, then subtracts it from the counter.
    Delta,
}

/// Worker tuning.
#[derive(Debug, Clone, Copy)]
pub struct ReconciliationOptions {
    /// Time between cycles; the first cycle runs one interval after start.
    pub interval: Duration,
    /// `COUNT` hint per SCAN page and batch size for counter reads.
    pub scan_count: usize,
    pub counter_mode: CounterMode,
}

impl Default for ReconciliationOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            scan_count: 500,
            counter_mode: CounterMode::Cumulative,
        }
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    /// Distinct counter keys found during scanning.
    pub keys_scanned: usize,
    /// Durable records whose click total was overwritten.
    pub records_updated: u64,
}

/// Why a cycle was abandoned.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("cache error during reconciliation: {0}")]
    Cache(#[from] CacheError),
    #[error("durable store error during reconciliation: {0}")]
    Store(#[from] AppError),
}

/// Folds click counters from the cache into the durable store.
pub struct ReconciliationWorker {
    cache: Arc<dyn CacheService>,
    link_repository: Arc<dyn LinkRepository>,
    options: ReconciliationOptions,
    state: watch::Sender<WorkerState>,
}

impl ReconciliationWorker {
    pub fn new(
        cache: Arc<dyn CacheService>,
        link_repository: Arc<dyn LinkRepository>,
        options: ReconciliationOptions,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            cache,
            link_repository,
            options,
            state,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Subscribes to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Runs one Scanning + Flushing pass and returns to Idle.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] if the cache or the store fails; in that case
    /// nothing was committed.
    pub async fn run_cycle(&self) -> Result<CycleReport, ReconcileError> {
        self.state.send_replace(WorkerState::Scanning);
        let result = self.scan_and_flush().await;
        self.state.send_replace(WorkerState::Idle);
        result
    }

    async fn scan_and_flush(&self) -> Result<CycleReport, ReconcileError> {
        let keys = self.scan_counter_keys().await?;
        if keys.is_empty() {
            return Ok(CycleReport::default());
        }

        self.state.send_replace(WorkerState::Flushing);

        let totals = self.read_totals(&keys).await?;
        let records_updated = match self.options.counter_mode {
            CounterMode::Cumulative => self.link_repository.set_click_totals(&totals).await?,
            CounterMode::Delta => self.flush_deltas(totals).await?,
        };

        Ok(CycleReport {
            keys_scanned: keys.len(),
            records_updated,
        })
    }

    /// Walks the counter keyspace page by page.
    async fn scan_counter_keys(&self) -> Result<Vec<String>, CacheError> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut cursor = 0;

        loop {
            let (next_cursor, page) = self
                .cache
                .scan_keys(CLICKS_PATTERN, cursor, self.options.scan_count)
                .await?;

            for key in page {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(keys)
    }

    /// Reads the current value of every counter.
    ///
    /// Keys that vanished or hold non-integers are skipped.
    async fn read_totals(&self, keys: &[String]) -> Result<Vec<ClickTotal>, CacheError> {
        let mut totals = Vec::with_capacity(keys.len());

        for batch in keys.chunks(self.options.scan_count.max(1)) {
            let values = self.cache.get_many(batch).await?;

            for (key, value) in batch.iter().zip(values) {
                let Some(code) = code_from_clicks_key(key) else {
                    warn!(key = %key, "Skipping counter with malformed key");
                    continue;
                };
                let Some(value) = value else {
                    debug!(key = %key, "Counter disappeared during reconciliation");
                    continue;
                };
                match value.parse::<i64>() {
                    Ok(total) => totals.push(ClickTotal::new(code, total)),
                    Err(_) => warn!(key = %key, value = %value, "Skipping non-integer counter"),
                }
            }
        }

        Ok(totals)
    }

    /// Adds non-zero counters to the durable totals, then settles the counters.
    ///
    /// Clicks recorded between the read and the decrement stay in the counter
    /// for the next cycle.
    async fn flush_deltas(&self, totals: Vec<ClickTotal>) -> Result<u64, ReconcileError> {
        let deltas: Vec<ClickTotal> = totals.into_iter().filter(|t| t.total > 0).collect();
        if deltas.is_empty() {
            return Ok(0);
        }

        let records_updated = self.link_repository.add_click_totals(&deltas).await?;

        for delta in &deltas {
            if let Err(e) = self
                .cache
                .decrement_by(&clicks_key(&delta.code), delta.total)
                .await
            {
                error!(
                    code = %delta.code,
                    amount = delta.total,
                    error = %e,
                    "Flushed clicks were not subtracted from the counter and will be added again"
                );
            }
        }

        Ok(records_updated)
    }

    /// Runs one scheduled cycle, logging instead of propagating failure.
    async fn tick(&self) {
        metrics::counter!("reconcile_cycles_total").increment(1);

        match self.run_cycle().await {
            Ok(report) if report.keys_scanned > 0 => {
                metrics::counter!("reconcile_keys_flushed_total")
                    .increment(report.keys_scanned as u64);
                info!(
                    keys_scanned = report.keys_scanned,
                    records_updated = report.records_updated,
                    "Reconciled click counters"
                );
            }
            Ok(_) => debug!("No click counters to reconcile"),
            Err(e) => {
                metrics::counter!("reconcile_failures_total").increment(1);
                error!(error = %e, "Reconciliation cycle abandoned, retrying next tick");
            }
        }
    }

    /// Runs cycles on the configured interval until `shutdown` fires.
    ///
    /// Shutdown is only observed while idle: a cycle that has started always
    /// finishes (commits or aborts) before the loop exits. Dropping the
    /// sender also stops the loop.
    pub async fn run(&self, mut shutdown: oneshot::Receiver<()>) {
        let period = self.options.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_seconds = period.as_secs(),
            scan_count = self.options.scan_count,
            counter_mode = ?self.options.counter_mode,
            "Reconciliation worker started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        self.state.send_replace(WorkerState::Stopped);
        info!("Reconciliation worker stopped");
    }

    /// Starts [`Self::run`] on a background task.
    pub fn spawn(self: Arc<Self>) -> ReconciliationHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let state = self.subscribe();

        let handle = tokio::spawn(async move { self.run(shutdown_rx).await });

        ReconciliationHandle {
            shutdown_tx: Some(shutdown_tx),
            state,
            handle,
        }
    }
}

/// Handle for a running reconciliation worker.
#[derive(Debug)]
pub struct ReconciliationHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    state: watch::Receiver<WorkerState>,
    handle: JoinHandle<()>,
}

impl ReconciliationHandle {
    /// Latest state published by the worker.
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Requests shutdown and waits for the worker to reach [`WorkerState::Stopped`].
    ///
    /// A cycle in progress completes first.
    pub async fn stop(mut self) -> Result<(), tokio::task::JoinError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.await
    }
}
