//! The rule table: one rule per license type.
//!
//! Rules are pure functions of the license restrictions and the attempt.
//! Each one returns the findings it produced, or an error when the inputs
//! are malformed.

use crate::attempt::AccessAttempt;
use crate::error::{ComplianceError, RuleResult};
use rightsguard_license::{RestrictionValue, Restrictions};
use rightsguard_types::{LicenseType, Severity, ViolationKind};

/// Purposes that count as training for do-not-train licenses, in
/// normalized form.
pub const TRAINING_PURPOSES: &[&str] = &["ai-training", "machine-learning"];

/// A rule's verdict on one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFinding {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub reason: &'static str,
}

/// Evaluation rule for one license type.
#[derive(Debug, Clone)]
pub struct Rule {
    pub license_type: LicenseType,
    /// Restriction key the rule reads. When present it must be a boolean.
    pub restriction_key: &'static str,
    /// Reason text reported on violation.
    pub reason: &'static str,
    pub kind: ViolationKind,
    violates: fn(&AccessAttempt) -> bool,
}

impl Rule {
    /// Applies the rule. Returns `Ok(None)` when the attempt complies.
    pub fn apply(
        &self,
        restrictions: &Restrictions,
        attempt: &AccessAttempt,
    ) -> RuleResult<Option<RuleFinding>> {
        if let Some(RestrictionValue::Text(_)) = restrictions.get(self.restriction_key) {
            return Err(ComplianceError::MalformedRestriction {
                key: self.restriction_key.to_string(),
            });
        }
        if !(self.violates)(attempt) {
            return Ok(None);
        }
        Ok(Some(RuleFinding {
            severity: self.kind.default_severity(),
            kind: self.kind.clone(),
            reason: self.reason,
        }))
    }
}

static RULES: [Rule; 5] = [
    Rule {
        license_type: LicenseType::DoNotTrain,
        restriction_key: "ai_training",
        reason: "AI training not permitted",
        kind: ViolationKind::UnauthorizedTraining,
        violates: |a| TRAINING_PURPOSES.contains(&a.normalized_purpose().as_str()),
    },
    Rule {
        license_type: LicenseType::CommercialRestrictions,
        restriction_key: "commercial_use",
        reason: "Commercial use not permitted",
        kind: ViolationKind::UnauthorizedCommercialUse,
        violates: |a| a.claims.commercial_intent,
    },
    Rule {
        license_type: LicenseType::AttributionRequired,
        restriction_key: "attribution_required",
        reason: "Attribution required",
        kind: ViolationKind::MissingAttribution,
        violates: |a| !a.claims.attribution_provided,
    },
    Rule {
        license_type: LicenseType::NdaEnforcement,
        restriction_key: "nda_required",
        reason: "NDA signature required",
        kind: ViolationKind::NdaBreach,
        violates: |a| !a.claims.nda_signed,
    },
    Rule {
        license_type: LicenseType::PreClearance,
        restriction_key: "pre_clearance_required",
        reason: "Pre-clearance required",
        kind: ViolationKind::MissingPreclearance,
        violates: |a| !a.claims.pre_approved,
    },
];

/// Returns the rule for `license_type`. Every type in the closed set has
/// exactly one.
#[must_use]
pub fn rule_for(license_type: LicenseType) -> &'static Rule {
    match license_type {
        LicenseType::DoNotTrain => &RULES[0],
        LicenseType::CommercialRestrictions => &RULES[1],
        LicenseType::AttributionRequired => &RULES[2],
        LicenseType::NdaEnforcement => &RULES[3],
        LicenseType::PreClearance => &RULES[4],
    }
}
