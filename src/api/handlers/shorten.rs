//! Handler for link shortening endpoint.

use axum::{Json, extract::State};
use serde_json::json;
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::url_check::parse_target_url;

/// Creates a short link for a target URL.
///
/// # Endpoint
///
/// `POST /shorten`
///
/// # Request Body
///
/// ```json
/// { "target_url": "https://a.example/page" }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "short_code": "1",
///   "target_url": "https://a.example/page",
///   "short_url": "http://localhost:8000/1"
/// }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request if the URL is not an absolute HTTP/HTTPS URL.
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>, AppError> {
    payload.validate()?;

    let target_url = parse_target_url(&payload.target_url).map_err(|e| {
        AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
    })?;

    let link = state.link_service.create_short_link(&target_url).await?;
    let short_url = state.link_service.get_short_url(&link.code);

    Ok(Json(ShortenResponse {
        short_code: link.code,
        target_url: link.target_url,
        short_url,
    }))
}
