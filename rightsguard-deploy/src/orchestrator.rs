//! Concurrent fan-out of one license to many platforms.

use crate::error::DeployError;
use crate::registry::{normalize, StrategyRegistry};
use crate::strategy::{DeployOptions, DeploymentOutcome, DeploymentStrategy, VerificationResult};
use chrono::{DateTime, Utc};
use rightsguard_license::License;
use rightsguard_types::{MetricEvent, NoopRecorder, Recorder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum platforms deployed at once.
    pub max_concurrency: usize,
    /// Deadline for a whole fan-out, in seconds.
    pub timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            timeout_secs: 120,
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Aggregate counts for a fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Percentage of platforms deployed, 0.0 to 100.0.
    pub success_rate: f64,
    pub completed_at: DateTime<Utc>,
}

/// Settled outcomes of a fan-out, split by status. Both lists keep the
/// order the platforms were requested in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub successful: Vec<DeploymentOutcome>,
    pub failed: Vec<DeploymentOutcome>,
    pub summary: DeploymentSummary,
}

impl DeploymentReport {
    fn from_outcomes(outcomes: Vec<DeploymentOutcome>) -> Self {
        let total = outcomes.len();
        let (successful, failed): (Vec<_>, Vec<_>) =
            outcomes.into_iter().partition(DeploymentOutcome::is_deployed);
        let success_rate = if total == 0 {
            0.0
        } else {
            successful.len() as f64 * 100.0 / total as f64
        };
        let summary = DeploymentSummary {
            total,
            successful: successful.len(),
            failed: failed.len(),
            success_rate,
            completed_at: Utc::now(),
        };
        Self {
            successful,
            failed,
            summary,
        }
    }

    /// Failed platforms worth another attempt.
    #[must_use]
    pub fn retryable_platforms(&self) -> Vec<&str> {
        self.failed
            .iter()
            .filter(|o| o.is_retryable())
            .map(|o| o.platform.as_str())
            .collect()
    }
}

/// Deploys licenses through the strategies in a registry.
pub struct DeploymentOrchestrator {
    registry: Arc<StrategyRegistry>,
    config: OrchestratorConfig,
    recorder: Arc<dyn Recorder>,
}

impl DeploymentOrchestrator {
    #[must_use]
    pub fn new(registry: Arc<StrategyRegistry>, config: OrchestratorConfig) -> Self {
        Self {
            registry,
            config,
            recorder: Arc::new(NoopRecorder),
        }
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn Recorder>) -> Self {
        self.recorder = recorder;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Deploys `license` to a single platform.
    ///
    /// # Errors
    ///
    /// `UnknownPlatform` when no strategy is registered for `platform`.
    /// Platform failures are returned as a failed outcome, not an error.
    pub async fn deploy_to_one(
        &self,
        license: &License,
        platform: &str,
        options: &DeployOptions,
    ) -> Result<DeploymentOutcome, DeployError> {
        let strategy = self.registry.require(platform)?;
        let platform = normalize(platform);
        let limit = self.config.timeout();
        let run = run_one(strategy, license, &platform, options, self.recorder.as_ref());
        match tokio::time::timeout(limit, run).await {
            Ok(outcome) => Ok(outcome),
            Err(_) => Ok(self.settle_failure(&platform, &DeployError::Timeout(limit))),
        }
    }

    /// Deploys `license` to every platform in `platforms` concurrently.
    ///
    /// Every platform settles: one failing never cancels another. Duplicate
    /// ids are deployed once. Unknown platforms fail with `UnknownPlatform`.
    /// Platforms still running at the deadline fail as retryable timeouts.
    pub async fn deploy_to_many<S: AsRef<str>>(
        &self,
        license: &License,
        platforms: &[S],
        options: &DeployOptions,
    ) -> DeploymentReport {
        let started = Instant::now();
        let limit = self.config.timeout();
        let deadline = tokio::time::Instant::now() + limit;
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let license = Arc::new(license.clone());

        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for platform in platforms {
            let id = normalize(platform.as_ref());
            if !seen.insert(id.clone()) {
                debug!("Skipping duplicate platform {}", id);
                continue;
            }

            let Some(strategy) = self.registry.get(&id) else {
                let outcome = self.settle_failure(&id, &DeployError::UnknownPlatform(id.clone()));
                pending.push((id, Pending::Settled(outcome)));
                continue;
            };

            let sem = semaphore.clone();
            let license = license.clone();
            let options = options.clone();
            let recorder = self.recorder.clone();
            let platform = id.clone();
            let handle = tokio::spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return DeploymentOutcome::failed(
                        platform,
                        &DeployError::Task("concurrency limiter closed".into()),
                    );
                };
                run_one(strategy, &license, &platform, &options, recorder.as_ref()).await
            });
            pending.push((id, Pending::Running(handle)));
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        for (platform, entry) in pending {
            let outcome = match entry {
                Pending::Settled(outcome) => outcome,
                Pending::Running(mut handle) => {
                    match tokio::time::timeout_at(deadline, &mut handle).await {
                        Ok(Ok(outcome)) => outcome,
                        Ok(Err(join_err)) => {
                            warn!("Deployment task for {} failed: {}", platform, join_err);
                            self.settle_failure(&platform, &DeployError::Task(join_err.to_string()))
                        }
                        Err(_) => {
                            handle.abort();
                            warn!("Deployment to {} did not finish within {:?}", platform, limit);
                            self.settle_failure(&platform, &DeployError::Timeout(limit))
                        }
                    }
                }
            };
            outcomes.push(outcome);
        }

        let report = DeploymentReport::from_outcomes(outcomes);
        info!(
            "Deployed license {} to {}/{} platforms ({:.1}%) in {:?}",
            license.id,
            report.summary.successful,
            report.summary.total,
            report.summary.success_rate,
            started.elapsed()
        );
        report
    }

    /// Builds a failed outcome for a failure raised outside the strategy.
    fn settle_failure(&self, platform: &str, err: &DeployError) -> DeploymentOutcome {
        let outcome = DeploymentOutcome::failed(platform, err);
        self.recorder.record(MetricEvent::DeploymentFailed {
            platform: outcome.platform.clone(),
            retryable: outcome.is_retryable(),
        });
        outcome
    }
}

enum Pending {
    Settled(DeploymentOutcome),
    Running(JoinHandle<DeploymentOutcome>),
}

/// Deploys to one platform and verifies on success. Never fails: errors
/// become failed outcomes.
async fn run_one(
    strategy: Arc<dyn DeploymentStrategy>,
    license: &License,
    platform: &str,
    options: &DeployOptions,
    recorder: &dyn Recorder,
) -> DeploymentOutcome {
    let started = Instant::now();
    let mut outcome = match strategy.deploy(license, options).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Deployment of license {} to {} failed: {}", license.id, platform, e);
            let outcome = DeploymentOutcome::failed(platform, &e);
            recorder.record(MetricEvent::DeploymentFailed {
                platform: platform.to_string(),
                retryable: outcome.is_retryable(),
            });
            return outcome;
        }
    };
    outcome.platform = platform.to_string();
    recorder.record(MetricEvent::DeploymentSucceeded {
        platform: platform.to_string(),
        elapsed: started.elapsed(),
    });

    if options.verify {
        let verification = match strategy.verify(license, &outcome).await {
            Ok(v) => v,
            Err(e) => VerificationResult::failed(e.to_string()),
        };
        if !verification.verified {
            warn!(
                "Deployment of license {} to {} did not verify: {}",
                license.id,
                platform,
                verification.detail.as_deref().unwrap_or("no detail")
            );
        }
        recorder.record(MetricEvent::DeploymentVerified {
            platform: platform.to_string(),
            verified: verification.verified,
        });
        outcome.verification = Some(verification);
    }
    outcome
}
