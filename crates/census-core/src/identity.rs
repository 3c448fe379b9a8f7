//! # Participant Identity Newtypes
//!
//! Newtype wrappers that keep addresses and nationality labels apart.
//! You cannot pass a `Nationality` where an `Address` is expected.
//!
//! ## Normalization Invariant
//!
//! Addresses are case-insensitive: `0xABC` and `0xabc` are one participant.
//! The canonical form is lower-case, applied once in [`Address::new`].
//! Nationality labels are compared exactly; `"france"` and `"France"` are two
//! different tallies.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Normalized participant address (typically a hex-encoded wallet address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

/// Nationality label disclosed by the identity proof.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nationality(String);

impl Address {
    /// Normalize and validate a raw address.
    ///
    /// Rejects only the empty string. The stored form is the lower-cased
    /// input; whitespace is kept as given.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ValidationError::EmptyAddress);
        }
        Ok(Self(raw.to_lowercase()))
    }

    /// Access the canonical (lower-case) form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Nationality {
    /// Validate a raw nationality label. The label is kept verbatim, so
    /// `" "` is a label of its own.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ValidationError::EmptyNationality);
        }
        Ok(Self(raw))
    }

    /// Access the label.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for Nationality {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl From<Nationality> for String {
    fn from(value: Nationality) -> Self {
        value.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for Nationality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
