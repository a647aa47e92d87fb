//! Restriction evaluator.

use crate::attempt::AccessAttempt;
use crate::rules::rule_for;
use chrono::{DateTime, Utc};
use rightsguard_license::{License, LicenseCodec};
use rightsguard_types::{
    MetricEvent, NoopRecorder, Recorder, Severity, ViolationDraft, ViolationKind,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Reason reported when the license fails its integrity check.
pub const INTEGRITY_REASON: &str = "License integrity violation";

/// Receives critical violations raised during evaluation.
///
/// `escalate` must not block: implementations hand the draft to a queue or
/// spawn the report.
pub trait EscalationSink: Send + Sync {
    fn escalate(&self, draft: ViolationDraft);
}

/// One violation found by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub reason: String,
}

/// Outcome of one compliance check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub compliant: bool,
    /// Violation reasons in evaluation order. Empty iff compliant.
    pub violations: Vec<String>,
    pub findings: Vec<Finding>,
    /// Integrity digest of the evaluated license.
    pub license_digest: String,
    #[serde(with = "duration_micros")]
    pub elapsed: Duration,
    pub checked_at: DateTime<Utc>,
    /// Set when evaluation faulted. The result is then non-compliant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComplianceResult {
    /// Highest severity among the findings.
    #[must_use]
    pub fn highest_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    /// Folds the findings into one violation draft for `attempt`, using the
    /// kind of the most severe finding. `None` when compliant.
    #[must_use]
    pub fn to_violation_draft(&self, attempt: &AccessAttempt) -> Option<ViolationDraft> {
        let primary = self.findings.iter().max_by_key(|f| f.severity)?;
        Some(
            ViolationDraft::new(
                primary.kind.clone(),
                &self.license_digest,
                &attempt.platform,
                &attempt.source,
            )
            .with_severity(primary.severity)
            .with_details(json!({
                "purpose": attempt.purpose,
                "reasons": self.violations,
                "claims": attempt.claims,
                "error": self.error,
            })),
        )
    }
}

/// Decides whether an access attempt complies with a license.
#[derive(Clone)]
pub struct RestrictionEvaluator {
    codec: LicenseCodec,
    escalation: Option<Arc<dyn EscalationSink>>,
    recorder: Arc<dyn Recorder>,
}

impl Default for RestrictionEvaluator {
    fn default() -> Self {
        Self::new(LicenseCodec::new())
    }
}

impl RestrictionEvaluator {
    /// Creates an evaluator validating seals with `codec`.
    #[must_use]
    pub fn new(codec: LicenseCodec) -> Self {
        Self {
            codec,
            escalation: None,
            recorder: Arc::new(NoopRecorder),
        }
    }

    #[must_use]
    pub fn with_escalation(mut self, sink: Arc<dyn EscalationSink>) -> Self {
        self.escalation = Some(sink);
        self
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn Recorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Checks `attempt` against `license`.
    ///
    /// The seal is validated first. A tampered license is non-compliant
    /// whatever the attempt, and a critical `integrity_violation` draft is
    /// handed to the escalation sink. A rule fault fails closed.
    pub fn check(&self, license: &License, attempt: &AccessAttempt) -> ComplianceResult {
        let started = Instant::now();
        let mut findings = Vec::new();
        let mut error = None;

        if self.codec.validate(license) {
            let rule = rule_for(license.license_type);
            match rule.apply(&license.restrictions, attempt) {
                Ok(Some(finding)) => findings.push(Finding {
                    kind: finding.kind,
                    severity: finding.severity,
                    reason: finding.reason.to_string(),
                }),
                Ok(None) => {}
                Err(e) => {
                    warn!("Evaluation of license {} failed: {}", license.id, e);
                    findings.push(Finding {
                        kind: ViolationKind::EvaluationFailure,
                        severity: ViolationKind::EvaluationFailure.default_severity(),
                        reason: format!("Evaluation failed: {e}"),
                    });
                    error = Some(e.to_string());
                }
            }
        } else {
            warn!(
                "License {} failed integrity validation (digest {})",
                license.id, license.digest
            );
            findings.push(Finding {
                kind: ViolationKind::IntegrityViolation,
                severity: Severity::Critical,
                reason: INTEGRITY_REASON.to_string(),
            });
            self.escalate_integrity(license, attempt);
        }

        let compliant = findings.is_empty();
        let elapsed = started.elapsed();
        debug!(
            "Checked {} attempt on {:?} against license {}: compliant={} in {:?}",
            attempt.purpose, attempt.platform, license.id, compliant, elapsed
        );
        self.recorder
            .record(MetricEvent::ComplianceChecked { compliant, elapsed });

        ComplianceResult {
            compliant,
            violations: findings.iter().map(|f| f.reason.clone()).collect(),
            findings,
            license_digest: license.digest.clone(),
            elapsed,
            checked_at: Utc::now(),
            error,
        }
    }

    fn escalate_integrity(&self, license: &License, attempt: &AccessAttempt) {
        let Some(sink) = &self.escalation else {
            return;
        };
        let recomputed = LicenseCodec::digest_of(license).ok();
        let draft = ViolationDraft::new(
            ViolationKind::IntegrityViolation,
            &license.digest,
            &attempt.platform,
            &attempt.source,
        )
        .with_severity(Severity::Critical)
        .with_details(json!({
            "reason": INTEGRITY_REASON,
            "license_id": license.id,
            "stored_digest": license.digest,
            "recomputed_digest": recomputed,
            "purpose": attempt.purpose,
        }));
        sink.escalate(draft);
    }
}

mod duration_micros {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_micros(u64::deserialize(d)?))
    }
}
