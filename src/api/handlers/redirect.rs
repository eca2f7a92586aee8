//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::code_codec;

/// Redirects a short code to its target URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Reject codes with characters outside the base62 alphabet
/// 2. Resolve through the cache-aside [`crate::application::services::Resolver`]
/// 3. Count the click on a background task
/// 4. Return 302 Found
///
/// # Errors
///
/// - 400 Bad Request for a malformed code
/// - 404 Not Found if the code does not exist
/// - 503 Service Unavailable if the database timed out
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    code_codec::decode(&code)?;

    let target_url = state.resolver.resolve(&code).await?;

    // Detached: the redirect never waits on the counter.
    let _ = state.click_recorder.record_click(&code);

    Ok((StatusCode::FOUND, [(header::LOCATION, target_url)]))
}
