//! API key quota endpoint.
//!
//! - GET /api/v1/keys/quota - Usage and estimated remaining quota per key

use axum::{Json, extract::State};
use chrono::Utc;

use crate::{error::AppError, handlers::AppState, models::api_key::KeyQuota};

/// List every key with a masked secret and its quota estimate.
///
/// # Response (200 OK)
///
/// ```json
/// [
///   {
///     "name": "ENV Key 1",
///     "masked_secret": "abc***xyz",
///     "requests_this_month": 42,
///     "remaining_display": 2458
///   }
/// ]
/// ```
pub async fn key_quota(State(state): State<AppState>) -> Result<Json<Vec<KeyQuota>>, AppError> {
    let summary = state
        .keys
        .quota_summary(state.monthly_limit, Utc::now())
        .await?;
    Ok(Json(summary))
}
