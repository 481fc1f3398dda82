//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Extracts the shared [`AppState`] and request data
//! 2. Delegates to a service
//! 3. Returns JSON, or an [`AppError`](crate::error::AppError) response

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::db::DbPool;
use crate::services::key_rotation::KeyRotationService;
use crate::services::run_service::RunService;
use crate::services::sweep::SweepController;

/// Manual check endpoint
pub mod checks;
pub mod health;
/// Key quota endpoint
pub mod keys;
/// Sweep control endpoints
pub mod sweeps;

/// State shared with every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub runs: Arc<RunService>,
    pub sweeps: Arc<SweepController>,
    pub keys: Arc<KeyRotationService>,
    /// Per-key monthly quota used by the quota estimate
    pub monthly_limit: Option<i64>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/checks", post(checks::run_check))
        .route("/api/v1/sweeps", post(sweeps::start_sweep))
        .route("/api/v1/sweeps/stop", post(sweeps::stop_sweep))
        .route("/api/v1/sweeps/status", get(sweeps::sweep_status))
        .route("/api/v1/keys/quota", get(keys::key_quota))
        .with_state(state)
}
