//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use tracing::debug;

use crate::domain::entities::{ClickTotal, Link};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::code_codec;

/// Maximum rows per `UPDATE ... FROM UNNEST` statement during reconciliation.
const CLICK_TOTAL_CHUNK: usize = 1_000;

/// Overwrites click totals with cumulative counter values.
const SET_CLICK_TOTALS: &str = r#"
    UPDATE links AS l
    SET click_total = v.total
    FROM UNNEST($1::text[], $2::bigint[]) AS v(code, total)
    WHERE l.code = v.code
"#;

/// Adds per-flush counter deltas to click totals.
const ADD_CLICK_TOTALS: &str = r#"
    UPDATE links AS l
    SET click_total = l.click_total + v.total
    FROM UNNEST($1::text[], $2::bigint[]) AS v(code, total)
    WHERE l.code = v.code
"#;

/// PostgreSQL repository for link storage and retrieval.
///
/// Queries use bound parameters and are checked at runtime rather than
/// against a database at compile time.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Runs `statement` over `totals` in chunks, all inside one transaction.
    ///
    /// `statement` binds `$1` to the codes and `$2` to the amounts.
    async fn apply_click_totals(
        &self,
        totals: &[ClickTotal],
        statement: &'static str,
    ) -> Result<u64, AppError> {
        if totals.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut updated = 0;

        for chunk in totals.chunks(CLICK_TOTAL_CHUNK) {
            let codes: Vec<&str> = chunk.iter().map(|t| t.code.as_str()).collect();
            let values: Vec<i64> = chunk.iter().map(|t| t.total).collect();

            let result = sqlx::query(statement)
                .bind(codes)
                .bind(values)
                .execute(&mut *tx)
                .await?;

            updated += result.rows_affected();
        }

        tx.commit().await?;

        Ok(updated)
    }
}

/// Placeholder code held by a record between insert and code assignment.
///
/// `~` is outside the base62 alphabet, so a placeholder can neither collide
/// with a derived code nor be resolved by a client.
fn placeholder_code() -> String {
    format!("~{:016x}", rand::random::<u64>())
}

/// Inserts a record with a placeholder code and returns its store-assigned identifier.
async fn insert_placeholder(conn: &mut PgConnection, target_url: &str) -> Result<i64, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO links (code, target_url)
        VALUES ($1, $2)
        RETURNING id
        "#,
    )
    .bind(placeholder_code())
    .bind(target_url)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Replaces the placeholder of record `id` with its derived code.
async fn update_code(conn: &mut PgConnection, id: i64, code: &str) -> Result<Link, AppError> {
    let link = sqlx::query_as::<_, Link>(
        r#"
        UPDATE links
        SET code = $2
        WHERE id = $1
        RETURNING id, code, target_url, created_at, click_total
        "#,
    )
    .bind(id)
    .bind(code)
    .fetch_one(&mut *conn)
    .await?;

    Ok(link)
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, target_url: &str) -> Result<Link, AppError> {
        let mut tx = self.pool.begin().await?;

        let id = insert_placeholder(&mut tx, target_url).await?;
        let identifier = u64::try_from(id).map_err(|_| {
            AppError::internal("Store issued a negative identifier", json!({ "id": id }))
        })?;
        let link = update_code(&mut tx, id, &code_codec::encode(identifier)).await?;

        tx.commit().await?;

        debug!(id = link.id, code = %link.code, "Created link");
        Ok(link)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let link = sqlx::query_as::<_, Link>(
            r#"
            SELECT id, code, target_url, created_at, click_total
            FROM links
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn set_click_totals(&self, totals: &[ClickTotal]) -> Result<u64, AppError> {
        self.apply_click_totals(totals, SET_CLICK_TOTALS).await
    }

    async fn add_click_totals(&self, deltas: &[ClickTotal]) -> Result<u64, AppError> {
        self.apply_click_totals(deltas, ADD_CLICK_TOTALS).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
