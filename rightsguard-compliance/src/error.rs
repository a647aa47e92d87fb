//! Error types for restriction evaluation.

use thiserror::Error;

/// Faults raised while a rule evaluates an attempt. The evaluator never
/// lets one of these pass as compliant: it reports the attempt as
/// non-compliant with the error attached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComplianceError {
    /// A restriction the rule depends on has the wrong shape.
    #[error("restriction {key:?} must be a boolean")]
    MalformedRestriction { key: String },
}

/// Result alias for rule evaluation.
pub type RuleResult<T> = Result<T, ComplianceError>;
