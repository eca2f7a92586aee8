//! CLI administration tool for base62-shortener.
//!
//! Provides code conversion, link inspection, manual click reconciliation,
//! and database checks without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Convert between ids and short codes
//! cargo run --bin admin -- encode 1001
//! cargo run --bin admin -- decode g9
//!
//! # Inspect a link
//! cargo run --bin admin -- link show g9
//!
//! # Fold click counters into the database now
//! cargo run --bin admin -- reconcile
//!
//! # View statistics
//! cargo run --bin admin -- stats
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection string (all commands except `encode`/`decode`)
//! - `REDIS_URL`: Redis connection string (`reconcile` only)

use base62_shortener::domain::reconciliation_worker::{
    ReconciliationOptions, ReconciliationWorker,
};
use base62_shortener::domain::repositories::LinkRepository;
use base62_shortener::infrastructure::cache::RedisCache;
use base62_shortener::infrastructure::persistence::PgLinkRepository;
use base62_shortener::utils::code_codec;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing base62-shortener.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Print the short code for a numeric id
    Encode {
        /// Record id (non-negative)
        id: u64,
    },

    /// Print the numeric id behind a short code
    Decode {
        /// Short code, e.g. "g9"
        code: String,
    },

    /// Inspect links
    Link {
        #[command(subcommand)]
        action: LinkAction,
    },

    /// Run one click reconciliation cycle
    Reconcile {
        /// Keys requested per SCAN page
        #[arg(long, default_value_t = 500)]
        scan_count: usize,
    },

    /// Show statistics
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Link inspection subcommands.
#[derive(Subcommand)]
enum LinkAction {
    /// Show a link by its short code
    Show { code: String },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode { id } => handle_encode(id),
        Commands::Decode { code } => handle_decode(&code)?,
        Commands::Link { action } => handle_link_action(action, &connect().await?).await?,
        Commands::Reconcile { scan_count } => handle_reconcile(&connect().await?, scan_count).await?,
        Commands::Stats => handle_stats(&connect().await?).await?,
        Commands::Db { action } => handle_db_action(action, &connect().await?).await?,
    }

    Ok(())
}

/// Connects to the database named by `DATABASE_URL`.
async fn connect() -> Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")
}

fn handle_encode(id: u64) {
    println!("{}", code_codec::encode(id).bright_yellow().bold());
}

fn handle_decode(code: &str) -> Result<()> {
    let id = code_codec::decode(code).with_context(|| format!("Cannot decode '{code}'"))?;
    println!("{}", id.to_string().bright_yellow().bold());
    Ok(())
}

/// Dispatches link inspection commands.
async fn handle_link_action(action: LinkAction, pool: &PgPool) -> Result<()> {
    let repo = PgLinkRepository::new(Arc::new(pool.clone()));

    match action {
        LinkAction::Show { code } => {
            code_codec::decode(&code).with_context(|| format!("'{code}' is not a short code"))?;

            let link = repo
                .find_by_code(&code)
                .await
                .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;

            let Some(link) = link else {
                println!("{}", format!("No link with code '{code}'").yellow());
                return Ok(());
            };

            println!("{}", "🔗 Link".bright_blue().bold());
            println!();
            println!("  ID:      {}", link.id.to_string().bright_black());
            println!("  Code:    {}", link.code.bright_yellow().bold());
            println!("  Target:  {}", link.target_url.cyan());
            println!(
                "  Created: {}",
                link.created_at
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
                    .bright_black()
            );
            println!(
                "  Clicks:  {}",
                link.click_total.to_string().bright_green().bold()
            );
            println!();
        }
    }

    Ok(())
}

/// Runs a single reconciliation cycle against Redis.
///
/// The in-process cache only lives inside the server, so Redis is required.
async fn handle_reconcile(pool: &PgPool, scan_count: usize) -> Result<()> {
    anyhow::ensure!(scan_count > 0, "--scan-count must be at least 1");

    let redis_url = std::env::var("REDIS_URL").context("REDIS_URL must be set")?;
    let cache = RedisCache::connect(&redis_url)
        .await
        .context("Failed to connect to Redis")?;

    let worker = ReconciliationWorker::new(
        Arc::new(cache),
        Arc::new(PgLinkRepository::new(Arc::new(pool.clone()))),
        ReconciliationOptions {
            scan_count,
            ..ReconciliationOptions::default()
        },
    );

    println!("{}", "🔄 Reconciling click counters...".bright_blue());

    let report = worker.run_cycle().await.context("Reconciliation failed")?;

    println!(
        "  Counters scanned: {}",
        report.keys_scanned.to_string().bright_white().bold()
    );
    println!(
        "  Links updated:    {}",
        report.records_updated.to_string().bright_green().bold()
    );
    println!("{}", "✅ Reconciliation complete".green().bold());

    Ok(())
}

/// Displays system statistics.
///
/// Click totals reflect the last reconciliation, not live counters.
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let links_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
        .fetch_one(pool)
        .await?;

    let clicks_count: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(click_total), 0)::BIGINT FROM links")
        .fetch_one(pool)
        .await?;

    println!(
        "  Links:  {}",
        links_count.to_string().bright_green().bold()
    );
    println!(
        "  Clicks: {}",
        clicks_count.to_string().bright_green().bold()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            PgLinkRepository::new(Arc::new(pool.clone()))
                .ping()
                .await
                .map_err(|e| anyhow::anyhow!("Database check failed: {}", e))?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!();
        }
    }

    Ok(())
}
