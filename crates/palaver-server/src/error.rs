use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use palaver_store::StoreError;

/// Errors surfaced by the messaging service and its HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller-supplied input violates a required-field or non-empty
    /// constraint.  Never retried; the message names the offending field.
    #[error("{0}")]
    Validation(String),

    /// A voice recording exceeds the configured size cap.
    #[error("Attachment too large: {size} bytes (max {max})")]
    AttachmentTooLarge { size: usize, max: usize },

    /// The message store or attachment storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A store or attachment operation exceeded the configured timeout.
    #[error("Storage timeout")]
    Timeout,

    /// The requested attachment does not exist.
    #[error("Not found")]
    NotFound,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            // The service validates recipients before the store does; this
            // only fires if a caller bypasses the service layer.
            StoreError::MissingRecipient => ApiError::Validation("Receiver ID required".into()),
            other => ApiError::Storage(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::AttachmentTooLarge { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ApiError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            ApiError::Timeout => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
