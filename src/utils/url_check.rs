//! Target URL acceptance for the shorten endpoint.
//!
//! The core stores whatever string it is given; this check belongs to the
//! HTTP surface and only admits absolute `http`/`https` URLs with a host.

use url::Url;

/// Errors raised for unacceptable target URLs.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TargetUrlError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL has no host")]
    MissingHost,
}

/// Parses `input` as a redirect target and returns its serialized form.
///
/// The serialized form is what gets stored, e.g. `https://Example.com` becomes
/// `https://example.com/`.
///
/// # Errors
///
/// See [`TargetUrlError`].
pub fn parse_target_url(input: &str) -> Result<String, TargetUrlError> {
    let url = Url::parse(input.trim()).map_err(|e| TargetUrlError::InvalidFormat(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(TargetUrlError::UnsupportedProtocol);
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(TargetUrlError::MissingHost);
    }

    Ok(url.into())
}
