//! Mapping of engine errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use engram_types::error::EngramError;

/// Wrapper so engine errors can flow out of handlers with `?`.
pub struct ApiError(pub EngramError);

impl From<EngramError> for ApiError {
    fn from(err: EngramError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngramError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EngramError::Store(_) | EngramError::Llm(_) | EngramError::Network(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(status = %status, error = %self.0, "request failed");
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}
