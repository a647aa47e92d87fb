//! Restriction compliance evaluation.
//!
//! A state-free rule table keyed by license type maps the claims of an
//! [`AccessAttempt`] to violation findings. The evaluator validates the
//! license seal first: a tampered license is non-compliant for every
//! attempt and is escalated as a critical violation.
//!
//! The crate has no I/O. Escalations leave through the [`EscalationSink`]
//! trait, implemented by whoever owns the violation pipeline.

mod attempt;
mod error;
mod evaluator;
mod rules;

pub use attempt::{AccessAttempt, Claims};
pub use error::{ComplianceError, RuleResult};
pub use evaluator::{
    ComplianceResult, EscalationSink, Finding, RestrictionEvaluator, INTEGRITY_REASON,
};
pub use rules::{rule_for, Rule, RuleFinding, TRAINING_PURPOSES};
