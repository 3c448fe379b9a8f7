//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps validation and store errors to HTTP status codes and returns JSON
//! bodies with a machine-readable code, a message, and optional details.
//! Server-side failures are logged here and replaced by a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use census_core::ValidationError;
use census_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context, present only for field validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type returned by handlers.
#[derive(Error, Debug)]
pub enum AppError {
    /// No route or static file matched (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// A submission field was missing or empty (400).
    #[error("validation error: {message}")]
    Validation {
        message: String,
        field: &'static str,
    },

    /// Body was not valid JSON, or a field had the wrong type (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Body exceeded the configured size limit (413).
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Unexpected server-side failure (500). Message is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),

    /// Tally backend unreachable or timed out (503). Message is logged, not returned.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::ServiceUnavailable(_) => {
                "The census backend is temporarily unavailable".to_string()
            }
            Self::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        };

        let details = match &self {
            Self::Validation { field, .. } => Some(serde_json::json!({ "field": field })),
            _ => None,
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation {
            message: err.to_string(),
            field: err.field(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        if err.is_unavailable() {
            Self::ServiceUnavailable(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}
