//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Requests rejected before they reach the saga coordinator.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The identity header is absent or not valid text.
    #[error("missing or invalid X-User-Name header")]
    MissingUserName,

    /// A path segment could not be parsed.
    #[error("invalid path parameter {name}: {reason}")]
    InvalidPath { name: &'static str, reason: String },
}

impl ApiError {
    fn reason(&self) -> &'static str {
        match self {
            ApiError::MissingUserName => "missing_user_name",
            ApiError::InvalidPath { .. } => "invalid_path",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "rejecting request");
        metrics::counter!("api_rejected_requests_total", "reason" => self.reason()).increment(1);
        let body = serde_json::json!({ "message": self.to_string() });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_are_client_errors() {
        let response = ApiError::MissingUserName.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::InvalidPath {
            name: "libraryUid",
            reason: "invalid length".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_user_names_the_header() {
        assert_eq!(
            ApiError::MissingUserName.to_string(),
            "missing or invalid X-User-Name header"
        );
    }
}
