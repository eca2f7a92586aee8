//! Repository trait for the durable store of short links.

use crate::domain::entities::{ClickTotal, Link};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for the authoritative link records.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Creates a record for `target_url` and assigns it the code derived from
    /// its store-issued identifier.
    ///
    /// The placeholder insert and the code update happen in one transaction,
    /// so no reader ever observes the record without its final code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, target_url: &str) -> Result<Link, AppError>;

    /// Finds a link by its short code.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Link))` if found
    /// - `Ok(None)` if not found
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError>;

    /// Overwrites the click total of every listed code in one transaction.
    ///
    /// Codes with no record are skipped. Either every write commits or none does.
    /// Returns the number of records updated.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] or [`AppError::Unavailable`] on database errors;
    /// nothing is committed in that case.
    async fn set_click_totals(&self, totals: &[ClickTotal]) -> Result<u64, AppError>;

    /// Adds each listed amount to the matching record's click total in one transaction.
    ///
    /// Used when counters do not outlive the process and hold only the clicks
    /// since the previous flush. Same skipping and atomicity as
    /// [`Self::set_click_totals`].
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] or [`AppError::Unavailable`] on database errors;
    /// nothing is committed in that case.
    async fn add_click_totals(&self, deltas: &[ClickTotal]) -> Result<u64, AppError>;

    /// Verifies the store is reachable.
    async fn ping(&self) -> Result<(), AppError>;
}
