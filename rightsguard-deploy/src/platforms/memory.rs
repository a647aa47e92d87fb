//! In-process strategy for local runs and tests.

use crate::error::{DeployError, DeployResult};
use crate::strategy::{DeployOptions, DeploymentOutcome, DeploymentStrategy, VerificationResult};
use async_trait::async_trait;
use rightsguard_license::{ArtifactBundle, License};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum Failure {
    Message(String),
    Status(u16),
}

/// Keeps published bundles in memory, keyed by license digest.
#[derive(Debug)]
pub struct MemoryStrategy {
    platform: String,
    latency: Option<Duration>,
    failure: Option<Failure>,
    published: Mutex<HashMap<String, ArtifactBundle>>,
}

impl MemoryStrategy {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            latency: None,
            failure: None,
            published: Mutex::new(HashMap::new()),
        }
    }

    /// Waits `latency` before every deploy.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fails every deploy with `message`.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(Failure::Message(message.into()));
        self
    }

    /// Fails every deploy with an HTTP `status`.
    #[must_use]
    pub fn failing_with_status(mut self, status: u16) -> Self {
        self.failure = Some(Failure::Status(status));
        self
    }

    /// The bundle published for `digest`, if any.
    pub async fn published(&self, digest: &str) -> Option<ArtifactBundle> {
        self.published.lock().await.get(digest).cloned()
    }

    pub async fn deployment_count(&self) -> usize {
        self.published.lock().await.len()
    }
}

#[async_trait]
impl DeploymentStrategy for MemoryStrategy {
    fn platform(&self) -> &str {
        &self.platform
    }

    async fn deploy(
        &self,
        license: &License,
        _options: &DeployOptions,
    ) -> DeployResult<DeploymentOutcome> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match &self.failure {
            Some(Failure::Message(message)) => return Err(DeployError::Platform(message.clone())),
            Some(Failure::Status(status)) => {
                return Err(DeployError::Http {
                    status: *status,
                    message: format!("{} rejected the request", self.platform),
                });
            }
            None => {}
        }

        let bundle = ArtifactBundle::for_license(license)?;
        let names = bundle.names();
        self.published
            .lock()
            .await
            .insert(license.digest.clone(), bundle);
        Ok(DeploymentOutcome::deployed(&self.platform, names)
            .with_location(format!("memory://{}/{}", self.platform, license.id)))
    }

    async fn verify(
        &self,
        license: &License,
        _outcome: &DeploymentOutcome,
    ) -> DeployResult<VerificationResult> {
        Ok(match self.published(&license.digest).await {
            Some(_) => VerificationResult::passed(),
            None => VerificationResult::failed(format!("no bundle for {}", license.digest)),
        })
    }
}
