//! Consistent error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// API-level error, mapped onto HTTP statuses.
#[derive(Debug)]
pub enum ApiError {
    /// Unknown product / target.
    NotFound(String),
    /// The target exists but no cascade stage applies to it.
    Unprocessable(String),
    /// Store or topic failure behind the handler.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Internal(m) => {
                tracing::error!(error = %m, "admin request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
