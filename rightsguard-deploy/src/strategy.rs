//! The strategy seam and the records it produces.

use crate::classify::classify;
use crate::error::{DeployError, DeployResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rightsguard_license::License;
use rightsguard_types::DeploymentId;
use serde::{Deserialize, Serialize};

/// Whether a failed deployment is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Retryable,
    NonRetryable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Deployed,
    Failed,
}

/// Per-request deployment options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployOptions {
    /// Verify each successful deployment before reporting it.
    pub verify: bool,
    /// Commit or change message for platforms that record one.
    pub message: Option<String>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            verify: true,
            message: None,
        }
    }
}

impl DeployOptions {
    /// Change message to use for `license`.
    #[must_use]
    pub fn message_for(&self, license: &License) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("Publish {} license {}", license.license_type, license.id))
    }
}

/// Result of checking that a deployment is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    pub checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl VerificationResult {
    #[must_use]
    pub fn passed() -> Self {
        Self {
            verified: true,
            checked_at: Utc::now(),
            detail: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            verified: false,
            checked_at: Utc::now(),
            detail: Some(detail.into()),
        }
    }
}

/// Outcome of deploying one license to one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    pub platform: String,
    pub deployment_id: DeploymentId,
    pub status: DeploymentStatus,
    /// Names of the artifacts published.
    pub artifacts: Vec<String>,
    /// Where the license can be found on the platform, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_class: Option<ErrorClass>,
    pub completed_at: DateTime<Utc>,
}

impl DeploymentOutcome {
    /// A successful deployment of `artifacts`.
    pub fn deployed(platform: impl Into<String>, artifacts: Vec<String>) -> Self {
        Self {
            platform: platform.into(),
            deployment_id: DeploymentId::new(),
            status: DeploymentStatus::Deployed,
            artifacts,
            location: None,
            verification: None,
            error: None,
            error_class: None,
            completed_at: Utc::now(),
        }
    }

    /// A failed deployment, classified from `err`.
    pub fn failed(platform: impl Into<String>, err: &DeployError) -> Self {
        Self {
            platform: platform.into(),
            deployment_id: DeploymentId::new(),
            status: DeploymentStatus::Failed,
            artifacts: Vec::new(),
            location: None,
            verification: None,
            error: Some(err.to_string()),
            error_class: Some(classify(err)),
            completed_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn is_deployed(&self) -> bool {
        self.status == DeploymentStatus::Deployed
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.error_class == Some(ErrorClass::Retryable)
    }
}

/// Deploys license artifacts to one platform and checks they are live.
#[async_trait]
pub trait DeploymentStrategy: Send + Sync {
    /// Platform identifier this strategy serves.
    fn platform(&self) -> &str;

    /// Publishes the license. An `Err` becomes a failed outcome.
    async fn deploy(&self, license: &License, options: &DeployOptions)
    -> DeployResult<DeploymentOutcome>;

    /// Checks that a previous deployment is live and matches the license.
    async fn verify(
        &self,
        license: &License,
        outcome: &DeploymentOutcome,
    ) -> DeployResult<VerificationResult>;
}
