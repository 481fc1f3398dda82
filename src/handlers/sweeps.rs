//! Auto-check sweep endpoints.
//!
//! - POST /api/v1/sweeps - Start a sweep over all active brands
//! - POST /api/v1/sweeps/stop - Stop the running sweep after its current brand
//! - GET /api/v1/sweeps/status - Sweep status and progress

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    error::AppError,
    handlers::AppState,
    services::sweep::{SweepSource, SweepStatus},
};

/// Start a sweep in the background.
///
/// Returns 202 with the status snapshot, or 409 when a sweep is already running.
pub async fn start_sweep(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SweepStatus>), AppError> {
    state.sweeps.start_detached(SweepSource::Manual)?;
    Ok((StatusCode::ACCEPTED, Json(state.sweeps.status())))
}

/// Request the running sweep to stop. 409 when idle.
pub async fn stop_sweep(State(state): State<AppState>) -> Result<Json<SweepStatus>, AppError> {
    if !state.sweeps.request_stop().await {
        return Err(AppError::NotRunning);
    }
    Ok(Json(state.sweeps.status()))
}

pub async fn sweep_status(State(state): State<AppState>) -> Json<SweepStatus> {
    Json(state.sweeps.status())
}
