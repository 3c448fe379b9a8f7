//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers to extract
//! and validate JSON bodies in handlers. Validation turns the raw DTO into
//! the domain types the store accepts, so handlers never see an unchecked
//! value.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use census_core::ValidationError;

use crate::error::AppError;

/// Request types that convert themselves into validated domain values.
pub trait Validate: Sized {
    /// The validated form of the request.
    type Valid;

    /// Check business rules and produce the validated value.
    fn validate(self) -> Result<Self::Valid, ValidationError>;
}

/// Extract a JSON body, mapping rejections to [`AppError`].
///
/// Oversized bodies become [`AppError::PayloadTooLarge`]; every other
/// rejection (bad syntax, wrong field types, missing content type) becomes
/// [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result.map(|Json(v)| v).map_err(|err| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(err.body_text())
        }
    })
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T::Valid, AppError> {
    let value = extract_json(result)?;
    Ok(value.validate()?)
}
