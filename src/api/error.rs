//! Unified API error handling
//!
//! Every endpoint failure is reported with the same JSON envelope.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::service::evaluation::EvaluationError;

/// Standard error response format
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Unique request ID for tracing
    pub request_id: String,
}

/// Unified API error type
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Bad request / validation error (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Post could not be classified (502)
    #[error("Classification failed: {0}")]
    ClassificationFailed(String),

    /// Evaluation exceeded the request deadline (504)
    #[error("Evaluation timed out: {0}")]
    Timeout(String),

    /// Internal invariant violated (500)
    #[error("Invalid aggregate state: {0}")]
    InvalidAggregateState(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::ClassificationFailed(_) => "classification_failed",
            ApiError::Timeout(_) => "timeout",
            ApiError::InvalidAggregateState(_) => "invalid_aggregate_state",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ClassificationFailed(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::InvalidAggregateState(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = self.error_type();
        let request_id = Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                error_type = error_type,
                status = status.as_u16(),
                request_id = %request_id,
                message = %self,
                "API error"
            );
        } else {
            tracing::warn!(
                error_type = error_type,
                status = status.as_u16(),
                request_id = %request_id,
                message = %self,
                "Rejected request"
            );
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            request_id,
        })
    }
}

impl From<EvaluationError> for ApiError {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            EvaluationError::ClassificationFailed(e) => ApiError::ClassificationFailed(e.to_string()),
            EvaluationError::Timeout(d) => {
                ApiError::Timeout(format!("no result within {} seconds", d.as_secs()))
            }
            EvaluationError::InvalidAggregateState(msg) => ApiError::InvalidAggregateState(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
