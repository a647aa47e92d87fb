//! Error types for deployment.

use rightsguard_license::LicenseError;
use std::time::Duration;
use thiserror::Error;

/// Result type for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors raised while deploying to or verifying a platform.
#[derive(Debug, Error)]
pub enum DeployError {
    /// No strategy is registered for the platform.
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    /// Transport-level failure (DNS, connect, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The platform answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The operation did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The platform answered with something we cannot use.
    #[error("unexpected response: {0}")]
    Protocol(String),

    /// The strategy is misconfigured.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Rendering the license artifacts failed.
    #[error("artifact error: {0}")]
    Artifact(#[from] LicenseError),

    /// The strategy task panicked or was cancelled.
    #[error("deployment task failed: {0}")]
    Task(String),

    /// Any other platform-reported failure.
    #[error("{0}")]
    Platform(String),
}

impl DeployError {
    /// Maps a reqwest error, keeping timeouts distinct.
    pub(crate) fn from_reqwest(err: reqwest::Error, limit: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(limit)
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}
