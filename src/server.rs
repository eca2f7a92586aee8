//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache setup, the reconciliation worker, and
//! the Axum server lifecycle.

use crate::config::Config;
use crate::domain::reconciliation_worker::{
    CounterMode, ReconciliationOptions, ReconciliationWorker,
};
use crate::infrastructure::cache::{CacheService, MemoryCache, RedisCache};
use crate::infrastructure::persistence::PgLinkRepository;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

/// Connection attempts made before startup gives up on the database.
const DB_CONNECT_ATTEMPTS: usize = 5;

/// Opens the PostgreSQL pool, retrying with exponential backoff.
///
/// # Errors
///
/// Returns the last connection error once all attempts are exhausted.
pub async fn connect_database(config: &Config) -> Result<PgPool> {
    let options = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime));

    let strategy = ExponentialBackoff::from_millis(2)
        .factor(100)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(DB_CONNECT_ATTEMPTS - 1);

    let pool = Retry::spawn(strategy, || {
        let options = options.clone();
        async move {
            options
                .connect(&config.database_url)
                .await
                .inspect_err(|e| tracing::warn!("Database connection attempt failed: {}", e))
        }
    })
    .await
    .context("Failed to connect to database")?;

    Ok(pool)
}

/// Connects to Redis when configured, otherwise uses the in-process cache.
///
/// A configured but unreachable Redis also falls back to the in-process
/// cache, so redirects keep working on a single node. In-process counters
/// start from zero on every restart, so they are paired with
/// [`CounterMode::Delta`]; Redis counters are cumulative.
pub async fn connect_cache(config: &Config) -> (Arc<dyn CacheService>, CounterMode) {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Cache: in-process (Redis not configured)");
        return (Arc::new(MemoryCache::new()), CounterMode::Delta);
    };

    match RedisCache::connect(redis_url).await {
        Ok(redis) => {
            tracing::info!("Cache enabled (Redis)");
            (Arc::new(redis), CounterMode::Cumulative)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to connect to Redis: {}. Using in-process cache.",
                e
            );
            (Arc::new(MemoryCache::new()), CounterMode::Delta)
        }
    }
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Redis cache (or in-process fallback)
/// - Background reconciliation worker
/// - Axum HTTP server
///
/// On SIGINT/SIGTERM the server drains in-flight requests, the worker is
/// stopped, and one last reconciliation cycle flushes the counters.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_database(&config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let (cache, counter_mode) = connect_cache(&config).await;
    let link_repository = Arc::new(PgLinkRepository::new(Arc::new(pool)));

    let worker = Arc::new(ReconciliationWorker::new(
        cache.clone(),
        link_repository.clone(),
        ReconciliationOptions {
            counter_mode,
            ..config.reconciliation_options()
        },
    ));
    let worker_handle = worker.clone().spawn();
    tracing::info!("Reconciliation worker started");

    let state = AppState::new(
        link_repository,
        cache,
        config.base_url.clone(),
        config.resolver_options(),
    );

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("HTTP server stopped, flushing click counters");

    if let Err(e) = worker_handle.stop().await {
        tracing::error!("Reconciliation worker did not stop cleanly: {}", e);
    }

    match worker.run_cycle().await {
        Ok(report) => tracing::info!(
            keys_scanned = report.keys_scanned,
            records_updated = report.records_updated,
            "Final reconciliation complete"
        ),
        Err(e) => tracing::error!("Final reconciliation failed: {}", e),
    }

    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
