//! Error types for the Paramlab server
//!
//! Every error leaves the server as the uniform envelope
//! `{"success": false, "error": ...}`. Transport and decode failures are
//! collapsed into a generic 500; their details are only logged.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use paramlab_core::types::ApiResponse;
use thiserror::Error;
use tracing::{error, warn};

pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";
pub const MISSING_EXPERIMENT_ID: &str = "Missing experiment ID";
pub const BACKEND_ERROR: &str = "Backend error";
pub const PAYLOAD_TOO_LARGE: &str = "Request body too large";

/// Header carrying the id logged alongside a failed request
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing experiment ID")]
    MissingExperimentId,

    /// Request body went over `limits.max_body_size`
    #[error("Request body exceeds the configured limit")]
    PayloadTooLarge,

    /// Backend answered with a non-success status
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: StatusCode, message: String },

    /// Backend could not be reached or the exchange failed mid-way
    #[error("Upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with something that is not the expected payload
    #[error("Upstream payload error: {0}")]
    UpstreamPayload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// HTTP status and client-facing message
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ServerError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::MissingExperimentId => (StatusCode::BAD_REQUEST, MISSING_EXPERIMENT_ID.to_string()),
            ServerError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, PAYLOAD_TOO_LARGE.to_string()),
            ServerError::Upstream { status, message } => (*status, message.clone()),
            ServerError::Transport(_)
            | ServerError::UpstreamPayload(_)
            | ServerError::Config(_)
            | ServerError::Io(_)
            | ServerError::Json(_)
            | ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR.to_string())
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let request_id = generate_request_id();

        if status.is_server_error() {
            error!(request_id = %request_id, status = %status, "API route error: {}", self);
        } else {
            warn!(request_id = %request_id, status = %status, "request rejected: {}", self);
        }

        let mut response = (status, Json(ApiResponse::<()>::error(message))).into_response();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
}

/// Generate a unique request ID for error tracking
fn generate_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_id_envelope() {
        let response = ServerError::MissingExperimentId.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(
            body_json(response).await,
            json!({"success": false, "error": "Missing experiment ID"})
        );
    }

    #[tokio::test]
    async fn test_upstream_status_preserved() {
        let response = ServerError::Upstream {
            status: StatusCode::NOT_FOUND,
            message: "Experiment not found".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"success": false, "error": "Experiment not found"})
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let response = ServerError::UpstreamPayload("expected value at line 1".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"success": false, "error": "Internal server error"})
        );
    }
}
