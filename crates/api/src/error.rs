//! Maps [`e4s_core::Error`] (and request-validation failures) onto HTTP
//! responses, per the status-code mapping in `spec.md` §7.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use e4s_core::error::Error as EngineError;

/// Error surfaced by a handler: either a validation failure caught before
/// the engine is called, or an [`EngineError`] propagated from it.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body or path/query parameters failed validation.
    #[error("{0}")]
    Validation(String),
    /// Propagated from the engine.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Engine(EngineError::NameInvalid(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Engine(EngineError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Engine(EngineError::Closed) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ApiError::Engine(EngineError::Transient(msg)) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            ApiError::Engine(EngineError::CorruptBitset(msg)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            ApiError::Engine(EngineError::Fatal(msg)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            ApiError::Engine(EngineError::Reindex(msg)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %message, status = %status, "request failed");
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// 404 helper for handlers that need "index not present" semantics beyond
/// what the engine itself returns (e.g. `GET /api/v1/index/{name}`, which
/// the engine treats as "zero-size stats" rather than an error).
pub fn not_found(index_name: &str) -> ApiError {
    ApiError::Engine(EngineError::NotFound(index_name.to_string()))
}
