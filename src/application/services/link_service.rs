//! Link creation and lookup service.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::domain::entities::Link;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::code_codec;

/// Service for creating shortened links and reading their records.
pub struct LinkService {
    link_repository: Arc<dyn LinkRepository>,
    base_url: String,
}

impl LinkService {
    /// Creates a new link service.
    ///
    /// `base_url` is the public origin short URLs are built on.
    pub fn new(link_repository: Arc<dyn LinkRepository>, base_url: impl Into<String>) -> Self {
        Self {
            link_repository,
            base_url: base_url.into(),
        }
    }

    /// Creates a short link for `target_url`.
    ///
    /// The code is derived from the identifier the store assigns, so the same
    /// URL shortened twice gets two distinct codes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn create_short_link(&self, target_url: &str) -> Result<Link, AppError> {
        let link = self.link_repository.create(target_url).await?;
        info!(id = link.id, code = %link.code, "Short link created");
        Ok(link)
    }

    /// Retrieves the durable record for a short code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the code is malformed,
    /// [`AppError::NotFound`] if no link has this code.
    pub async fn get_link_by_code(&self, code: &str) -> Result<Link, AppError> {
        code_codec::decode(code)?;

        self.link_repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))
    }

    /// Constructs the public short URL for a code.
    pub fn get_short_url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), code)
    }
}
