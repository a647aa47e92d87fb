//! Error types for storage and the violation pipeline.

use rightsguard_types::{ResolutionStatus, ViolationId};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised by a [`RecordStore`](crate::RecordStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Errors raised by the pipeline, consumer and monitor.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("violation not found: {0}")]
    NotFound(ViolationId),

    #[error("license not found: {0}")]
    LicenseNotFound(String),

    #[error("cannot move violation from {from} to {to}")]
    InvalidTransition {
        from: ResolutionStatus,
        to: ResolutionStatus,
    },

    /// The status changed between read and conditional write.
    #[error("violation {id} is no longer {expected}")]
    Conflict {
        id: ViolationId,
        expected: ResolutionStatus,
    },

    #[error("bus error: {0}")]
    Bus(String),

    #[error("response failed: {0}")]
    Response(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The consumer has shut down.
    #[error("consumer closed")]
    Closed,
}
