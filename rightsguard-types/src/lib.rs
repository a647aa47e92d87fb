//! Core type definitions for Rightsguard.
//!
//! This crate defines the shared vocabulary used by every other crate in the
//! workspace:
//! - License, violation and deployment identifiers (UUID v7)
//! - The closed license-type enum and lifecycle status
//! - Violation severity and resolution status (with its state machine)
//! - Violation drafts handed from evaluators to the violation pipeline
//! - The metric `Recorder` observer injected into orchestrator and pipeline

mod ids;
mod kinds;
mod recorder;
mod violation;

pub use ids::{DeploymentId, LicenseId, ViolationId};
pub use kinds::{LicenseStatus, LicenseType, ResolutionStatus, Severity};
pub use recorder::{MetricEvent, NoopRecorder, Recorder, TracingRecorder};
pub use violation::{ViolationDraft, ViolationKind};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unsupported license type: {0}")]
    UnsupportedType(String),

    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}
