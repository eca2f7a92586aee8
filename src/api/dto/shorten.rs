//! DTOs for link shortening endpoint.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::utils::url_check::parse_target_url;

/// Request to shorten a URL.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The absolute HTTP/HTTPS URL to redirect to.
    #[serde(alias = "targetUrl")]
    #[validate(
        length(min = 1, max = 2048, message = "URL must be 1-2048 characters"),
        custom(function = "validate_target_url")
    )]
    pub target_url: String,
}

fn validate_target_url(value: &str) -> Result<(), ValidationError> {
    parse_target_url(value).map(|_| ()).map_err(|e| {
        let mut error = ValidationError::new("target_url");
        error.message = Some(e.to_string().into());
        error
    })
}

/// Response describing the created short link.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub short_code: String,
    pub target_url: String,
    pub short_url: String,
}
