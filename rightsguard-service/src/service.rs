//! The wired service: issue, deploy, evaluate, report, monitor.

use crate::config::{ConfigError, GuardConfig, PlatformsConfig, ResponseConfig, StorageConfig};
use chrono::{DateTime, Utc};
use rightsguard_compliance::{AccessAttempt, ComplianceResult, RestrictionEvaluator};
use rightsguard_deploy::platforms::{GitContentsStrategy, MemoryStrategy, WebhookStrategy};
use rightsguard_deploy::{
    DeployError, DeployOptions, DeploymentOrchestrator, DeploymentReport, StrategyRegistry,
};
use rightsguard_license::{License, LicenseCodec, LicenseError, Restrictions};
use rightsguard_types::{
    LicenseStatus, Recorder, ResolutionStatus, TracingRecorder, ViolationDraft, ViolationId,
};
use rightsguard_violations::{
    AccessEventProcessor, ComplianceLogEntry, ComplianceMonitor, ConsumerHandle, CycleSummary,
    EventBus, ImmediateResponder, InboundEvent, LogResponder, PartitionedConsumer, PipelineError,
    RecordStore, SqliteStore, StoreError, StoredViolation, TracingBus, ViolationPipeline,
    WebhookResponder,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Errors surfaced by the service facade.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    License(#[from] LicenseError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("license not found: {0}")]
    LicenseNotFound(String),

    #[error("cannot move license from {from} to {to}")]
    InvalidLicenseTransition {
        from: LicenseStatus,
        to: LicenseStatus,
    },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Inputs for issuing a license.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub license_type: String,
    pub creator: String,
    pub content: Vec<u8>,
    pub restrictions: Restrictions,
    pub expires_at: Option<DateTime<Utc>>,
    /// Platforms to deploy to right after issuing. Nothing is deployed when
    /// empty.
    pub platforms: Vec<String>,
    pub options: DeployOptions,
}

impl IssueRequest {
    pub fn new(
        license_type: impl Into<String>,
        creator: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            license_type: license_type.into(),
            creator: creator.into(),
            content: content.into(),
            restrictions: Restrictions::new(),
            expires_at: None,
            platforms: Vec::new(),
            options: DeployOptions::default(),
        }
    }

    #[must_use]
    pub fn with_restrictions(mut self, restrictions: Restrictions) -> Self {
        self.restrictions = restrictions;
        self
    }

    #[must_use]
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    #[must_use]
    pub fn deploy_to<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platforms = platforms.into_iter().map(Into::into).collect();
        self
    }
}

/// A freshly issued license and, when platforms were requested, its
/// deployment report.
#[derive(Debug, Clone)]
pub struct Issued {
    pub license: License,
    pub deployment: Option<DeploymentReport>,
}

/// Collaborators the service is assembled from.
///
/// [`Components::from_config`] builds the production set; tests swap in
/// memory stores, taps and mock strategies.
pub struct Components {
    pub codec: LicenseCodec,
    pub store: Arc<dyn RecordStore>,
    pub bus: Arc<dyn EventBus>,
    pub registry: StrategyRegistry,
    pub responder: Arc<dyn ImmediateResponder>,
    pub recorder: Arc<dyn Recorder>,
}

impl Components {
    /// Builds every collaborator described by `config`.
    ///
    /// # Errors
    ///
    /// Fails on an unusable signing seed, an unopenable store or a platform
    /// whose strategy rejects its configuration.
    pub fn from_config(config: &GuardConfig) -> ServiceResult<Self> {
        Ok(Self {
            codec: config.signing.codec()?,
            store: open_store(&config.storage)?,
            bus: Arc::new(TracingBus),
            registry: build_registry(&config.platforms)?,
            responder: build_responder(&config.response)?,
            recorder: Arc::new(TracingRecorder),
        })
    }
}

fn open_store(config: &StorageConfig) -> ServiceResult<Arc<dyn RecordStore>> {
    let store = match &config.path {
        Some(path) => SqliteStore::open(path)?,
        None => SqliteStore::open_in_memory()?,
    };
    Ok(Arc::new(store))
}

fn build_registry(config: &PlatformsConfig) -> ServiceResult<StrategyRegistry> {
    let mut registry = StrategyRegistry::new();
    for git in &config.git {
        registry.register(Arc::new(GitContentsStrategy::new(git.clone())?));
    }
    for hook in &config.webhook {
        registry.register(Arc::new(WebhookStrategy::new(hook.clone())?));
    }
    for id in &config.memory {
        registry.register(Arc::new(MemoryStrategy::new(id.clone())));
    }
    Ok(registry)
}

fn build_responder(config: &ResponseConfig) -> ServiceResult<Arc<dyn ImmediateResponder>> {
    let Some(url) = &config.webhook_url else {
        return Ok(Arc::new(LogResponder));
    };
    let mut responder = WebhookResponder::new(url.clone(), config.timeout())?;
    if let Some(token) = &config.auth_token {
        responder = responder.with_auth_token(token.clone());
    }
    Ok(Arc::new(responder))
}

/// Running service.
///
/// Owns the partitioned consumer and, once started, the monitor task. Call
/// [`shutdown`](Self::shutdown) to drain queued events before dropping.
pub struct Rightsguard {
    codec: LicenseCodec,
    pipeline: Arc<ViolationPipeline>,
    orchestrator: DeploymentOrchestrator,
    evaluator: RestrictionEvaluator,
    processor: Arc<AccessEventProcessor>,
    consumer: PartitionedConsumer,
    monitor: Arc<ComplianceMonitor>,
    monitor_interval: Duration,
    monitor_task: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Rightsguard {
    /// Builds the production components and starts the service.
    pub fn from_config(config: &GuardConfig) -> ServiceResult<Self> {
        Ok(Self::start(config, Components::from_config(config)?))
    }

    /// Starts the consumer workers on the current runtime. The monitor is
    /// not started until [`start_monitor`](Self::start_monitor).
    #[must_use]
    pub fn start(config: &GuardConfig, components: Components) -> Self {
        let Components {
            codec,
            store,
            bus,
            registry,
            responder,
            recorder,
        } = components;

        let pipeline = Arc::new(
            ViolationPipeline::new(store, bus)
                .with_responder(responder)
                .with_recorder(recorder.clone())
                .with_config(config.pipeline.clone()),
        );
        let orchestrator =
            DeploymentOrchestrator::new(Arc::new(registry), config.orchestrator.clone())
                .with_recorder(recorder.clone());

        // Consumer-side evaluation reports integrity failures itself.
        let processor = Arc::new(AccessEventProcessor::new(
            RestrictionEvaluator::new(codec.clone()).with_recorder(recorder.clone()),
            pipeline.clone(),
        ));
        let consumer = PartitionedConsumer::spawn(processor.clone(), &config.consumer);
        let evaluator = RestrictionEvaluator::new(codec.clone())
            .with_recorder(recorder.clone())
            .with_escalation(Arc::new(consumer.handle()));

        let monitor = Arc::new(
            ComplianceMonitor::new(pipeline.clone(), codec.clone()).with_recorder(recorder),
        );

        info!(
            "Rightsguard started: {} platforms, {} seal, {} partitions",
            orchestrator.registry().len(),
            codec.scheme(),
            config.consumer.partitions
        );

        Self {
            codec,
            pipeline,
            orchestrator,
            evaluator,
            processor,
            consumer,
            monitor,
            monitor_interval: config.monitor.interval(),
            monitor_task: None,
        }
    }

    pub fn codec(&self) -> &LicenseCodec {
        &self.codec
    }

    pub fn pipeline(&self) -> &Arc<ViolationPipeline> {
        &self.pipeline
    }

    /// Registered platform ids.
    #[must_use]
    pub fn platforms(&self) -> Vec<String> {
        self.orchestrator.registry().platforms()
    }

    /// Generates a license, stores it and deploys it to the requested
    /// platforms.
    ///
    /// The license is stored before deployment, so a failed deployment
    /// leaves an issued license that can be redeployed.
    pub async fn issue(&self, request: IssueRequest) -> ServiceResult<Issued> {
        let license = self.codec.generate(
            &request.license_type,
            &request.creator,
            &request.content,
            request.restrictions,
            request.expires_at,
        )?;
        self.pipeline.store().put_license(&license)?;
        info!("Issued {} license {}", license.license_type, license.id);

        let deployment = if request.platforms.is_empty() {
            None
        } else {
            Some(self.deploy(&license, &request.platforms, &request.options).await)
        };
        Ok(Issued {
            license,
            deployment,
        })
    }

    /// Deploys a license to every listed platform.
    pub async fn deploy<S: AsRef<str>>(
        &self,
        license: &License,
        platforms: &[S],
        options: &DeployOptions,
    ) -> DeploymentReport {
        self.orchestrator
            .deploy_to_many(license, platforms, options)
            .await
    }

    /// Redeploys a stored license to the platforms that failed with a
    /// retryable error in `report`.
    pub async fn retry_failed(
        &self,
        license: &License,
        report: &DeploymentReport,
        options: &DeployOptions,
    ) -> Option<DeploymentReport> {
        let retryable = report.retryable_platforms();
        if retryable.is_empty() {
            return None;
        }
        info!("Retrying {} platforms for license {}", retryable.len(), license.id);
        Some(self.deploy(license, &retryable, options).await)
    }

    /// Looks up a stored license by digest.
    pub fn license(&self, digest: &str) -> ServiceResult<License> {
        self.pipeline
            .store()
            .license(digest)?
            .ok_or_else(|| ServiceError::LicenseNotFound(digest.to_string()))
    }

    /// Evaluates an access against a stored license, logs it and reports
    /// any violation before returning.
    pub async fn check_access(
        &self,
        license_digest: &str,
        attempt: &AccessAttempt,
    ) -> ServiceResult<ComplianceResult> {
        Ok(self.processor.process_access(license_digest, attempt).await?)
    }

    /// Evaluates an access against a license held by the caller, e.g. one
    /// read back from a platform. Nothing is logged; integrity failures are
    /// escalated to the consumer queue.
    #[must_use]
    pub fn evaluate(&self, license: &License, attempt: &AccessAttempt) -> ComplianceResult {
        self.evaluator.check(license, attempt)
    }

    /// Queues an inbound event for ordered processing.
    pub async fn submit(&self, event: InboundEvent) -> ServiceResult<()> {
        Ok(self.consumer.handle().submit(event).await?)
    }

    /// Handle for submitting events from other tasks.
    #[must_use]
    pub fn consumer_handle(&self) -> ConsumerHandle {
        self.consumer.handle()
    }

    /// Reports a violation found by an external detector.
    pub async fn report(&self, draft: ViolationDraft) -> ServiceResult<StoredViolation> {
        Ok(self.pipeline.report(draft).await?)
    }

    pub async fn update_violation(
        &self,
        id: ViolationId,
        status: ResolutionStatus,
    ) -> ServiceResult<StoredViolation> {
        Ok(self.pipeline.update_status(id, status).await?)
    }

    pub fn violations_for(&self, license_digest: &str) -> ServiceResult<Vec<StoredViolation>> {
        Ok(self.pipeline.violations_for(license_digest)?)
    }

    pub fn compliance_log(&self, license_digest: &str) -> ServiceResult<Vec<ComplianceLogEntry>> {
        Ok(self.pipeline.store().compliance_log(license_digest)?)
    }

    /// Revokes a license. Revoking twice is a no-op.
    pub fn revoke(&self, license_digest: &str) -> ServiceResult<License> {
        let license = self.license(license_digest)?;
        if !license.status.can_transition_to(LicenseStatus::Revoked) {
            return Err(ServiceError::InvalidLicenseTransition {
                from: license.status,
                to: LicenseStatus::Revoked,
            });
        }
        if license.status != LicenseStatus::Revoked {
            self.pipeline
                .store()
                .set_license_status(license_digest, LicenseStatus::Revoked)?;
            info!("Revoked license {}", license.id);
        }
        Ok(License {
            status: LicenseStatus::Revoked,
            ..license
        })
    }

    /// Runs one monitoring cycle now.
    pub async fn run_monitor_cycle(&self) -> ServiceResult<CycleSummary> {
        Ok(self.monitor.run_cycle().await?)
    }

    /// Starts the periodic monitor. Does nothing if already running.
    pub fn start_monitor(&mut self) {
        if self.monitor_task.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let task = self
            .monitor
            .clone()
            .spawn(self.monitor_interval, cancel.clone());
        info!("Compliance monitor running every {:?}", self.monitor_interval);
        self.monitor_task = Some((cancel, task));
    }

    #[must_use]
    pub fn monitor_running(&self) -> bool {
        self.monitor_task.is_some()
    }

    /// Stops the monitor, then drains and stops the consumer.
    pub async fn shutdown(self) {
        if let Some((cancel, task)) = self.monitor_task {
            cancel.cancel();
            if let Err(e) = task.await {
                warn!("Compliance monitor ended abnormally: {}", e);
            }
        }
        self.consumer.shutdown().await;
        info!("Rightsguard stopped");
    }
}
