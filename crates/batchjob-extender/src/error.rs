//! HTTP error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use batchjob_common::Error;

/// Error returned by a handler
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

impl ApiError {
    /// Malformed request body
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(Error::validation(message))
    }

    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation { .. } | Error::Serialization { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::DuplicateEntry { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // K8s-style Status body
        let body = serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": self.0.to_string(),
            "code": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}
