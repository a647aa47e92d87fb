//! Closed enums shared across the workspace.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of restriction a license encodes. The set is closed: anything
/// else is rejected when a license is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LicenseType {
    /// Content may not be used to train AI / ML models.
    DoNotTrain,
    /// Content may not be used commercially.
    CommercialRestrictions,
    /// Any use must credit the creator.
    AttributionRequired,
    /// Access requires a signed NDA.
    NdaEnforcement,
    /// Every use must be cleared with the creator in advance.
    PreClearance,
}

impl LicenseType {
    /// All license types, in declaration order.
    pub const ALL: [LicenseType; 5] = [
        Self::DoNotTrain,
        Self::CommercialRestrictions,
        Self::AttributionRequired,
        Self::NdaEnforcement,
        Self::PreClearance,
    ];

    /// Returns the wire name (`do-not-train`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DoNotTrain => "do-not-train",
            Self::CommercialRestrictions => "commercial-restrictions",
            Self::AttributionRequired => "attribution-required",
            Self::NdaEnforcement => "nda-enforcement",
            Self::PreClearance => "pre-clearance",
        }
    }

    /// Human-readable title used in rendered artifacts.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::DoNotTrain => "Do Not Train",
            Self::CommercialRestrictions => "Commercial Use Restricted",
            Self::AttributionRequired => "Attribution Required",
            Self::NdaEnforcement => "NDA Required",
            Self::PreClearance => "Pre-Clearance Required",
        }
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnsupportedType(s.to_string()))
    }
}

/// Lifecycle status of a license.
///
/// `Active -> Expired` happens by time, `Active | Expired -> Revoked` by
/// administrative action. `Revoked` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    #[default]
    Active,
    Expired,
    Revoked,
}

impl LicenseStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }

    /// Returns true if moving from `self` to `next` is a legal lifecycle step.
    #[must_use]
    pub fn can_transition_to(&self, next: LicenseStatus) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Expired)
                | (Self::Active, Self::Revoked)
                | (Self::Expired, Self::Revoked)
        ) || *self == next
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            other => Err(Error::UnknownVariant {
                kind: "license status",
                value: other.to_string(),
            }),
        }
    }
}

/// Violation severity. Ordered: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// High and critical violations take the immediate-response path.
    #[must_use]
    pub fn requires_immediate_response(&self) -> bool {
        *self >= Self::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(Error::UnknownVariant {
                kind: "severity",
                value: other.to_string(),
            }),
        }
    }
}

/// Resolution status of a recorded violation.
///
/// ```text
/// open ──> investigating ──> resolved
///   │            └─────────> false_positive
///   ├──> resolved
///   └──> false_positive
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    #[default]
    Open,
    Investigating,
    Resolved,
    FalsePositive,
}

impl ResolutionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Investigating => "investigating",
            Self::Resolved => "resolved",
            Self::FalsePositive => "false_positive",
        }
    }

    /// Resolved and false-positive violations accept no further changes.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::FalsePositive)
    }

    /// Returns true if `next` is reachable from `self` in one step.
    /// Re-asserting the current status is accepted.
    #[must_use]
    pub fn can_transition_to(&self, next: ResolutionStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            Self::Open => matches!(
                next,
                Self::Investigating | Self::Resolved | Self::FalsePositive
            ),
            Self::Investigating => matches!(next, Self::Resolved | Self::FalsePositive),
            Self::Resolved | Self::FalsePositive => false,
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "investigating" => Ok(Self::Investigating),
            "resolved" => Ok(Self::Resolved),
            "false_positive" => Ok(Self::FalsePositive),
            other => Err(Error::UnknownVariant {
                kind: "resolution status",
                value: other.to_string(),
            }),
        }
    }
}
