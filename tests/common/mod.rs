#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use base62_shortener::application::services::ResolverOptions;
use base62_shortener::domain::entities::{ClickTotal, Link};
use base62_shortener::domain::repositories::LinkRepository;
use base62_shortener::error::AppError;
use base62_shortener::infrastructure::cache::MemoryCache;
use base62_shortener::routes::api_router;
use base62_shortener::state::AppState;
use base62_shortener::utils::code_codec;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const BASE_URL: &str = "http://sho.rt";

/// Durable store double that assigns ids sequentially from 1.
#[derive(Default)]
pub struct InMemoryLinkRepository {
    links: Mutex<Vec<Link>>,
    find_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryLinkRepository {
    /// Number of `find_by_code` calls that reached the store.
    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail with `503 Service Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn link(&self, code: &str) -> Option<Link> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.code == code)
            .cloned()
    }

    /// Overwrites a stored total, as if left by an earlier process.
    pub fn set_click_total(&self, code: &str, total: i64) {
        if let Some(link) = self.links.lock().unwrap().iter_mut().find(|l| l.code == code) {
            link.click_total = total;
        }
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::unavailable(
                "Database unavailable",
                serde_json::json!({}),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LinkRepository for InMemoryLinkRepository {
    async fn create(&self, target_url: &str) -> Result<Link, AppError> {
        self.check_available()?;
        let mut links = self.links.lock().unwrap();
        let id = links.len() as i64 + 1;
        let link = Link::new(
            id,
            code_codec::encode(id as u64),
            target_url.to_string(),
            Utc::now(),
            0,
        );
        links.push(link.clone());
        Ok(link)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.link(code))
    }

    async fn set_click_totals(&self, totals: &[ClickTotal]) -> Result<u64, AppError> {
        self.check_available()?;
        let mut links = self.links.lock().unwrap();
        let mut updated = 0;
        for total in totals {
            if let Some(link) = links.iter_mut().find(|l| l.code == total.code) {
                link.click_total = total.total;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn add_click_totals(&self, deltas: &[ClickTotal]) -> Result<u64, AppError> {
        self.check_available()?;
        let mut links = self.links.lock().unwrap();
        let mut updated = 0;
        for delta in deltas {
            if let Some(link) = links.iter_mut().find(|l| l.code == delta.code) {
                link.click_total += delta.total;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check_available()
    }
}

/// In-memory state: sequential-id store and in-process cache.
pub fn create_test_state() -> (AppState, Arc<InMemoryLinkRepository>, MemoryCache) {
    state_with_repo(Arc::new(InMemoryLinkRepository::default()))
}

/// State over an existing store and a fresh in-process cache, as after a restart.
pub fn state_with_repo(
    repo: Arc<InMemoryLinkRepository>,
) -> (AppState, Arc<InMemoryLinkRepository>, MemoryCache) {
    let cache = MemoryCache::new();

    let state = AppState::new(
        repo.clone(),
        Arc::new(cache.clone()),
        BASE_URL,
        ResolverOptions::default(),
    );

    (state, repo, cache)
}

/// Full application router over in-memory backends.
pub fn make_server() -> (TestServer, Arc<InMemoryLinkRepository>, MemoryCache) {
    let (state, repo, cache) = create_test_state();
    let server = TestServer::new(api_router(state)).unwrap();
    (server, repo, cache)
}

/// Router over an existing store with a fresh in-process cache.
pub fn restart_server(repo: Arc<InMemoryLinkRepository>) -> (TestServer, MemoryCache) {
    let (state, _, cache) = state_with_repo(repo);
    let server = TestServer::new(api_router(state)).unwrap();
    (server, cache)
}

/// Lets fire-and-forget click increments land.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
}

pub async fn insert_link(pool: &PgPool, code: &str, url: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO links (code, target_url) VALUES ($1, $2) RETURNING id")
        .bind(code)
        .bind(url)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn click_total(pool: &PgPool, code: &str) -> i64 {
    sqlx::query_scalar("SELECT click_total FROM links WHERE code = $1")
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
}
