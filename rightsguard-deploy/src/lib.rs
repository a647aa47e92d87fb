//! License deployment across external platforms.
//!
//! A [`StrategyRegistry`] maps platform identifiers to
//! [`DeploymentStrategy`] implementations. The [`DeploymentOrchestrator`]
//! fans a license out to many platforms at once, verifies each successful
//! deployment, and classifies failures as retryable or not.
//!
//! Shared strategies live in [`platforms`]: one git contents-API strategy
//! serves GitHub, GitHub Enterprise, Gitea and Codeberg; a webhook
//! strategy covers anything that accepts a JSON POST.

mod classify;
mod error;
mod orchestrator;
pub mod platforms;
mod registry;
mod strategy;

pub use classify::{classify, classify_message, classify_status, RETRYABLE_PATTERNS};
pub use error::{DeployError, DeployResult};
pub use orchestrator::{DeploymentOrchestrator, DeploymentReport, DeploymentSummary, OrchestratorConfig};
pub use registry::StrategyRegistry;
pub use strategy::{
    DeployOptions, DeploymentOutcome, DeploymentStatus, DeploymentStrategy, ErrorClass,
    VerificationResult,
};
