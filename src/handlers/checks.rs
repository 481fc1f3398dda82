//! Manual check endpoint.
//!
//! - POST /api/v1/checks - Check where a brand ranks right now

use axum::{Json, extract::State};

use crate::{
    error::AppError,
    handlers::AppState,
    models::serp_run::RunResult,
    services::run_service::CheckRequest,
};

/// Run a manual check for one brand.
///
/// # Request Body
///
/// ```json
/// {
///   "brand_id": "550e8400-...",
///   "query": "tokopedia",   // optional, defaults to the brand code
///   "country": "id",        // optional
///   "device": "mobile"      // optional, defaults to desktop
/// }
/// ```
///
/// # Response
///
/// - **200 OK**: the run, with `cached: true` when served from the short-lived cache
/// - **404**: unknown or inactive brand
/// - **400**: bad country code, or no active API key
/// - **502**: every API key failed
pub async fn run_check(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Result<Json<RunResult>, AppError> {
    let run = state.runs.run_check_for_brand(request).await?;
    Ok(Json(run))
}
