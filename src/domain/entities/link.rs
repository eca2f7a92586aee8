//! Link entity representing a shortened URL record.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A shortened URL record owned by the durable store.
///
/// `id` is assigned by the store on creation and `code` is derived from it.
/// `click_total` is written only by the reconciliation worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Link {
    pub id: i64,
    pub code: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub click_total: i64,
}

impl Link {
    /// Creates a new Link instance.
    pub fn new(
        id: i64,
        code: String,
        target_url: String,
        created_at: DateTime<Utc>,
        click_total: i64,
    ) -> Self {
        Self {
            id,
            code,
            target_url,
            created_at,
            click_total,
        }
    }
}

/// Snapshot of a code's cache-resident counter, applied as an overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickTotal {
    pub code: String,
    pub total: i64,
}

impl ClickTotal {
    pub fn new(code: impl Into<String>, total: i64) -> Self {
        Self {
            code: code.into(),
            total,
        }
    }
}
