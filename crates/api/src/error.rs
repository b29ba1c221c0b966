//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use engine::EngineError;
use order_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Engine error.
    Engine(EngineError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Engine(err) => engine_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

/// The verification failures mean the store may or may not hold the
/// intended status; 502 tells the caller the backing store misbehaved and
/// a re-query is required.
fn engine_error_to_response(err: EngineError) -> (StatusCode, String) {
    match &err {
        EngineError::OrderNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        EngineError::VerificationFailed { .. }
        | EngineError::BulkWriteMismatch { .. }
        | EngineError::BulkVerificationFailed { .. } => (StatusCode::BAD_GATEWAY, err.to_string()),
        EngineError::LedgerContention { .. } => (StatusCode::CONFLICT, err.to_string()),
        EngineError::Store(StoreError::VersionConflict { .. }) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        EngineError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, err.to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Engine(EngineError::Store(err))
    }
}
