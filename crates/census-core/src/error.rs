//! # Validation Errors
//!
//! Raised when a submission is missing one of its two fields. These are
//! detected before the tally store is ever invoked.

use thiserror::Error;

/// A submission field failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Address was absent or empty.
    #[error("address is required")]
    EmptyAddress,

    /// Nationality was absent or empty.
    #[error("nationality is required")]
    EmptyNationality,
}

impl ValidationError {
    /// Name of the submission field that failed.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyAddress => "address",
            Self::EmptyNationality => "nationality",
        }
    }
}
