//! Metric observer injected into the orchestrator and the pipeline.
//!
//! The core only emits events; the recorder implementation decides how to
//! aggregate or export them.

use crate::{Severity, ViolationKind};
use std::time::Duration;
use tracing::debug;

/// A single observable event emitted by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricEvent {
    /// A platform deployment finished successfully.
    DeploymentSucceeded { platform: String, elapsed: Duration },
    /// A platform deployment failed.
    DeploymentFailed { platform: String, retryable: bool },
    /// A deployment was verified (or failed verification).
    DeploymentVerified { platform: String, verified: bool },
    /// A restriction check completed.
    ComplianceChecked { compliant: bool, elapsed: Duration },
    /// A violation was stored.
    ViolationReported { kind: ViolationKind, severity: Severity },
    /// The immediate-response collaborator was invoked.
    ResponseTriggered { severity: Severity, succeeded: bool },
    /// A monitoring cycle completed.
    MonitorCycle { licenses: usize, expired: usize, tampered: usize },
}

/// Receives metric events. Implementations must be cheap and non-blocking.
pub trait Recorder: Send + Sync {
    fn record(&self, event: MetricEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn record(&self, _event: MetricEvent) {}
}

/// Writes every event to the `rightsguard::metrics` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl Recorder for TracingRecorder {
    fn record(&self, event: MetricEvent) {
        debug!(target: "rightsguard::metrics", "{:?}", event);
    }
}
