//! Retryable / non-retryable classification of deployment failures.
//!
//! Classification is advisory: the orchestrator never retries on its own,
//! it only tells the caller which failures are worth another attempt.

use crate::error::DeployError;
use crate::strategy::ErrorClass;

/// Lowercase message fragments that mark a failure as transient.
pub const RETRYABLE_PATTERNS: &[&str] = &[
    "timeout",
    "timed out",
    "connection reset",
    "connection refused",
    "connection closed",
    "broken pipe",
    "temporarily unavailable",
    "service unavailable",
    "bad gateway",
    "gateway timeout",
    "rate limit",
    "too many requests",
    "econnreset",
    "econnrefused",
    "etimedout",
];

/// Classifies an HTTP status code.
#[must_use]
pub fn classify_status(status: u16) -> ErrorClass {
    match status {
        408 | 429 | 502 | 503 | 504 => ErrorClass::Retryable,
        _ => ErrorClass::NonRetryable,
    }
}

/// Classifies a free-form failure message against [`RETRYABLE_PATTERNS`].
#[must_use]
pub fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_ascii_lowercase();
    if RETRYABLE_PATTERNS.iter().any(|p| lower.contains(p)) {
        ErrorClass::Retryable
    } else {
        ErrorClass::NonRetryable
    }
}

/// Classifies a deployment error.
#[must_use]
pub fn classify(err: &DeployError) -> ErrorClass {
    match err {
        DeployError::Network(_) | DeployError::Timeout(_) => ErrorClass::Retryable,
        DeployError::Http { status, message } => match classify_status(*status) {
            ErrorClass::Retryable => ErrorClass::Retryable,
            ErrorClass::NonRetryable => classify_message(message),
        },
        DeployError::Platform(message) => classify_message(message),
        DeployError::UnknownPlatform(_)
        | DeployError::Protocol(_)
        | DeployError::Config(_)
        | DeployError::Artifact(_)
        | DeployError::Task(_) => ErrorClass::NonRetryable,
    }
}
