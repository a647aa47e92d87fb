//! Violation drafts: what an evaluator or external reporter hands to the
//! violation pipeline before an identifier and detection time are assigned.

use crate::{Error, Severity, ViolationId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type tag of a violation. Serialized as its snake_case tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ViolationKind {
    /// The license record failed integrity validation.
    IntegrityViolation,
    /// Content was used for AI / ML training against a do-not-train license.
    UnauthorizedTraining,
    /// Commercial use against a commercial-restrictions license.
    UnauthorizedCommercialUse,
    /// Use without attribution.
    MissingAttribution,
    /// Access without a signed NDA.
    NdaBreach,
    /// Use without pre-clearance.
    MissingPreclearance,
    /// The restriction evaluator itself faulted; treated as a violation.
    EvaluationFailure,
    /// Reported by an external detector with its own tag.
    Other(String),
}

impl ViolationKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::IntegrityViolation => "integrity_violation",
            Self::UnauthorizedTraining => "unauthorized_training",
            Self::UnauthorizedCommercialUse => "unauthorized_commercial_use",
            Self::MissingAttribution => "missing_attribution",
            Self::NdaBreach => "nda_breach",
            Self::MissingPreclearance => "missing_preclearance",
            Self::EvaluationFailure => "evaluation_failure",
            Self::Other(tag) => tag,
        }
    }

    /// Default severity assigned when a detector does not supply one.
    #[must_use]
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::IntegrityViolation => Severity::Critical,
            Self::UnauthorizedTraining | Self::NdaBreach | Self::EvaluationFailure => {
                Severity::High
            }
            Self::UnauthorizedCommercialUse | Self::MissingPreclearance => Severity::Medium,
            Self::MissingAttribution | Self::Other(_) => Severity::Low,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViolationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "integrity_violation" => Self::IntegrityViolation,
            "unauthorized_training" => Self::UnauthorizedTraining,
            "unauthorized_commercial_use" => Self::UnauthorizedCommercialUse,
            "missing_attribution" => Self::MissingAttribution,
            "nda_breach" => Self::NdaBreach,
            "missing_preclearance" => Self::MissingPreclearance,
            "evaluation_failure" => Self::EvaluationFailure,
            "" => {
                return Err(Error::UnknownVariant {
                    kind: "violation kind",
                    value: String::new(),
                });
            }
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<ViolationKind> for String {
    fn from(kind: ViolationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl TryFrom<String> for ViolationKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A violation as reported, before the pipeline stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationDraft {
    /// Pre-assigned identifier. Redelivered bus events carry the identifier
    /// of the first delivery so the pipeline can deduplicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ViolationId>,
    pub kind: ViolationKind,
    pub severity: Severity,
    /// Integrity digest of the license the violation refers to.
    pub license_digest: String,
    pub platform: String,
    pub source: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl ViolationDraft {
    /// Creates a draft with the kind's default severity and empty details.
    pub fn new(
        kind: ViolationKind,
        license_digest: impl Into<String>,
        platform: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let severity = kind.default_severity();
        Self {
            id: None,
            kind,
            severity,
            license_digest: license_digest.into(),
            platform: platform.into(),
            source: source.into(),
            details: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: ViolationId) -> Self {
        self.id = Some(id);
        self
    }
}
