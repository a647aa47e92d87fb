//! Error types for license generation.
//!
//! Validation never produces an error: a record that fails validation is a
//! normal outcome reported as `false`.

use thiserror::Error;

/// License generation errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The requested license type is not one of the closed set.
    #[error("unsupported license type: {0}")]
    UnsupportedType(String),

    /// A restriction value is neither a boolean nor a string.
    #[error("invalid restriction {key:?}: {reason}")]
    InvalidRestriction { key: String, reason: String },

    /// A generation input is unusable (empty creator, expiry in the past...).
    #[error("invalid license input: {0}")]
    InvalidInput(String),

    /// The record contains a value canonical serialization refuses.
    #[error("canonicalization failed: {0}")]
    Canonicalization(String),

    /// The configured sealer can only verify, not sign.
    #[error("sealer {0} cannot sign")]
    SigningUnavailable(&'static str),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rightsguard_types::Error> for LicenseError {
    fn from(err: rightsguard_types::Error) -> Self {
        match err {
            rightsguard_types::Error::UnsupportedType(t) => Self::UnsupportedType(t),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
