//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use std::collections::HashMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Failure of a single search-provider request made with one API key.
///
/// Carries whatever the provider sent back so the key rotation service can
/// read quota hints from failed responses too.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    /// HTTP status, `None` for transport failures (timeout, DNS, ...)
    pub status: Option<u16>,

    pub message: String,

    /// Response headers with lower-cased names
    pub headers: HashMap<String, String>,

    pub body: serde_json::Value,
}

impl ProviderError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            headers: HashMap::new(),
            body: serde_json::Value::Null,
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            ..Self::transport(message)
        }
    }

    /// Whether the status signals an exhausted or refused key rather than
    /// a transient failure.
    pub fn is_quota_signal(&self) -> bool {
        matches!(self.status, Some(401 | 402 | 403 | 429))
    }
}

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Input Errors**: Unknown brand, invalid request data, no usable keys
/// - **Provider Errors**: Every candidate API key failed
/// - **Sweep State Errors**: Starting a second sweep, stopping an idle one
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested brand does not exist or is inactive.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Active brand not found")]
    BrandNotFound,

    /// No active search-provider key is configured.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("No active search API keys configured")]
    NoActiveKeys,

    /// Every active key was tried and the last one failed with this error.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("All API keys failed: {0}")]
    AllKeysFailed(#[source] ProviderError),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A sweep is already in progress.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Auto check is already running")]
    AlreadyRunning,

    /// No sweep is in progress.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Auto check is not running")]
    NotRunning,
}

/// Convert AppError into an HTTP response.
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Database details are hidden from clients.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BrandNotFound => (StatusCode::NOT_FOUND, "brand_not_found", self.to_string()),
            AppError::NoActiveKeys => (StatusCode::BAD_REQUEST, "no_active_keys", self.to_string()),
            AppError::AllKeysFailed(_) => {
                (StatusCode::BAD_GATEWAY, "all_keys_failed", self.to_string())
            }
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::AlreadyRunning => (StatusCode::CONFLICT, "already_running", self.to_string()),
            AppError::NotRunning => (StatusCode::CONFLICT, "not_running", self.to_string()),
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
