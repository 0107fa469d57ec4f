//! Error types for ietl-extract
//!
//! Every handler error becomes `{"error": {"code", "message"}}`.

use crate::db::StoreError;
use crate::services::requirement_deriver::DerivationError;
use crate::services::schema_validator::ValidationError;
use crate::services::JobError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Malformed or unusable request (400), with a machine-readable code
    #[error("Invalid request: {message}")]
    BadRequest { code: &'static str, message: String },

    /// Well-formed request that cannot be processed (422)
    #[error("Unprocessable: {message}")]
    Unprocessable { code: &'static str, message: String },

    /// Request conflicts with the job's current state (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code: "BAD_REQUEST",
            message: message.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<DerivationError> for ApiError {
    fn from(err: DerivationError) -> Self {
        match err {
            DerivationError::EmptyInput => ApiError::BadRequest {
                code: "EmptyInput",
                message: err.to_string(),
            },
            DerivationError::InvalidConstruct(ref inner) => ApiError::Unprocessable {
                code: inner.code(),
                message: err.to_string(),
            },
            DerivationError::DuplicateStoryId(_) => ApiError::Unprocessable {
                code: "DuplicateStoryId",
                message: err.to_string(),
            },
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Validation(e) => e.into(),
            JobError::Derivation(e) => e.into(),
            JobError::Store(e) => e.into(),
            JobError::NotFound(id) => ApiError::NotFound(format!("Job not found: {}", id)),
            JobError::ConstructNotFound(id) => {
                ApiError::NotFound(format!("Construct not found: {}", id))
            }
            JobError::Transition(_)
            | JobError::AlreadyRunning(_)
            | JobError::StillProcessing { .. }
            | JobError::NotCompleted { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            ApiError::Unprocessable { code, message } => {
                (StatusCode::UNPROCESSABLE_ENTITY, code, message)
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
