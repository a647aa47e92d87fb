//! Persisted records.

use chrono::{DateTime, Utc};
use rightsguard_compliance::{AccessAttempt, ComplianceResult};
use rightsguard_types::{ResolutionStatus, Severity, ViolationDraft, ViolationId, ViolationKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A violation as stored. Append-only apart from `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredViolation {
    pub id: ViolationId,
    pub detected_at: DateTime<Utc>,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub license_digest: String,
    pub platform: String,
    pub source: String,
    pub details: Value,
    pub status: ResolutionStatus,
    pub updated_at: DateTime<Utc>,
}

impl StoredViolation {
    /// Builds an open record from a draft.
    #[must_use]
    pub fn from_draft(draft: ViolationDraft, id: ViolationId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            detected_at: now,
            kind: draft.kind,
            severity: draft.severity,
            license_digest: draft.license_digest,
            platform: draft.platform,
            source: draft.source,
            details: draft.details,
            status: ResolutionStatus::Open,
            updated_at: now,
        }
    }
}

/// One evaluated access attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceLogEntry {
    pub license_digest: String,
    pub platform: String,
    pub purpose: String,
    pub source: String,
    pub compliant: bool,
    pub violations: Vec<String>,
    pub elapsed_micros: u64,
    pub checked_at: DateTime<Utc>,
}

impl ComplianceLogEntry {
    #[must_use]
    pub fn new(attempt: &AccessAttempt, result: &ComplianceResult) -> Self {
        Self {
            license_digest: result.license_digest.clone(),
            platform: attempt.platform.clone(),
            purpose: attempt.purpose.clone(),
            source: attempt.source.clone(),
            compliant: result.compliant,
            violations: result.violations.clone(),
            elapsed_micros: u64::try_from(result.elapsed.as_micros()).unwrap_or(u64::MAX),
            checked_at: result.checked_at,
        }
    }
}
