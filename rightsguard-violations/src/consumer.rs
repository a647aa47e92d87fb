//! Inbound event processing, partitioned by license digest.

use crate::bus::Topic;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::ViolationPipeline;
use crate::record::ComplianceLogEntry;
use rightsguard_compliance::{
    AccessAttempt, ComplianceResult, EscalationSink, RestrictionEvaluator, TRAINING_PURPOSES,
};
use rightsguard_types::{ResolutionStatus, ViolationDraft, ViolationId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// An event arriving from outside: an access to evaluate, a violation
/// reported by an external detector, or a resolution-status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    Access {
        license_digest: String,
        attempt: AccessAttempt,
    },
    Violation(ViolationDraft),
    StatusChange {
        license_digest: String,
        violation_id: ViolationId,
        status: ResolutionStatus,
    },
}

impl InboundEvent {
    /// Ordering key: events with the same key are processed in order.
    #[must_use]
    pub fn license_digest(&self) -> &str {
        match self {
            Self::Access { license_digest, .. } | Self::StatusChange { license_digest, .. } => {
                license_digest
            }
            Self::Violation(draft) => &draft.license_digest,
        }
    }
}

/// Evaluates access events and forwards violations to the pipeline.
pub struct AccessEventProcessor {
    evaluator: RestrictionEvaluator,
    pipeline: Arc<ViolationPipeline>,
}

impl AccessEventProcessor {
    /// The evaluator should have no escalation sink: integrity failures
    /// found here are reported directly.
    #[must_use]
    pub fn new(evaluator: RestrictionEvaluator, pipeline: Arc<ViolationPipeline>) -> Self {
        Self {
            evaluator,
            pipeline,
        }
    }

    /// Evaluates one access against the stored license.
    ///
    /// Appends a compliance-log entry and publishes the evaluated access on
    /// the access-events topic. Training purposes also go to
    /// training-attempts and non-compliant ones to compliance-alerts before
    /// the violation is reported.
    pub async fn process_access(
        &self,
        license_digest: &str,
        attempt: &AccessAttempt,
    ) -> PipelineResult<ComplianceResult> {
        let store = self.pipeline.store();
        let license = store
            .license(license_digest)?
            .ok_or_else(|| PipelineError::LicenseNotFound(license_digest.to_string()))?;

        let result = self.evaluator.check(&license, attempt);
        store.append_compliance_log(&ComplianceLogEntry::new(attempt, &result))?;

        let event = json!({
            "license_id": license.id,
            "platform": attempt.platform,
            "purpose": attempt.purpose,
            "source": attempt.source,
            "compliant": result.compliant,
            "violations": result.violations,
        });
        self.pipeline
            .publish(Topic::AccessEvents, license_digest, event.clone())
            .await;
        if TRAINING_PURPOSES.contains(&attempt.normalized_purpose().as_str()) {
            self.pipeline
                .publish(Topic::TrainingAttempts, license_digest, event.clone())
                .await;
        }
        if !result.compliant {
            self.pipeline
                .publish(Topic::ComplianceAlerts, license_digest, event)
                .await;
        }

        if let Some(draft) = result.to_violation_draft(attempt) {
            self.pipeline.report(draft).await?;
        }
        Ok(result)
    }

    /// Handles any inbound event.
    pub async fn handle(&self, event: InboundEvent) -> PipelineResult<()> {
        match event {
            InboundEvent::Access {
                license_digest,
                attempt,
            } => {
                self.process_access(&license_digest, &attempt).await?;
            }
            InboundEvent::Violation(draft) => {
                self.pipeline.report(draft).await?;
            }
            InboundEvent::StatusChange {
                violation_id,
                status,
                ..
            } => {
                self.pipeline.update_status(violation_id, status).await?;
            }
        }
        Ok(())
    }
}

/// Consumer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Number of workers. Each license digest maps to exactly one.
    pub partitions: usize,
    /// Queue depth per worker.
    pub queue_depth: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            partitions: 4,
            queue_depth: 1024,
        }
    }
}

/// Submits events to a running [`PartitionedConsumer`].
///
/// Escalations travel on a separate unbounded queue per partition so a
/// full event queue never loses one.
#[derive(Clone)]
pub struct ConsumerHandle {
    senders: Arc<[mpsc::Sender<InboundEvent>]>,
    escalations: Arc<[mpsc::UnboundedSender<ViolationDraft>]>,
}

impl ConsumerHandle {
    fn sender_for(&self, event: &InboundEvent) -> &mpsc::Sender<InboundEvent> {
        &self.senders[partition(event.license_digest(), self.senders.len())]
    }

    /// Queues `event`, waiting while its partition is full.
    pub async fn submit(&self, event: InboundEvent) -> PipelineResult<()> {
        self.sender_for(&event)
            .send(event)
            .await
            .map_err(|_| PipelineError::Closed)
    }

    /// Queues `event` without waiting.
    pub fn try_submit(&self, event: InboundEvent) -> PipelineResult<()> {
        self.sender_for(&event).try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                PipelineError::Bus("partition queue full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => PipelineError::Closed,
        })
    }
}

impl EscalationSink for ConsumerHandle {
    fn escalate(&self, draft: ViolationDraft) {
        let index = partition(&draft.license_digest, self.escalations.len());
        if let Err(mpsc::error::SendError(draft)) = self.escalations[index].send(draft) {
            warn!(
                "Dropped escalation for license {}: consumer is shut down",
                draft.license_digest
            );
        }
    }
}

/// Worker pool that processes inbound events, one queue per partition.
pub struct PartitionedConsumer {
    handle: ConsumerHandle,
    workers: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl PartitionedConsumer {
    /// Starts the workers on the current runtime.
    #[must_use]
    pub fn spawn(processor: Arc<AccessEventProcessor>, config: &ConsumerConfig) -> Self {
        let partitions = config.partitions.max(1);
        let cancel = CancellationToken::new();
        let mut senders = Vec::with_capacity(partitions);
        let mut escalations = Vec::with_capacity(partitions);
        let mut workers = Vec::with_capacity(partitions);

        for index in 0..partitions {
            let (tx, rx) = mpsc::channel::<InboundEvent>(config.queue_depth.max(1));
            let (esc_tx, esc_rx) = mpsc::unbounded_channel::<ViolationDraft>();
            workers.push(tokio::spawn(run_partition(
                index,
                Queues { events: rx, escalations: esc_rx },
                processor.clone(),
                cancel.clone(),
            )));
            senders.push(tx);
            escalations.push(esc_tx);
        }

        Self {
            handle: ConsumerHandle {
                senders: senders.into(),
                escalations: escalations.into(),
            },
            workers,
            cancel,
        }
    }

    #[must_use]
    pub fn handle(&self) -> ConsumerHandle {
        self.handle.clone()
    }

    /// Closes every partition, processes what is already queued and waits
    /// for the workers. Later submissions through any handle fail with
    /// `Closed`.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!("Partition worker ended abnormally: {}", e);
            }
        }
    }
}

struct Queues {
    events: mpsc::Receiver<InboundEvent>,
    escalations: mpsc::UnboundedReceiver<ViolationDraft>,
}

async fn run_partition(
    index: usize,
    mut queues: Queues,
    processor: Arc<AccessEventProcessor>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            draft = queues.escalations.recv() => match draft {
                Some(draft) => process(index, &processor, InboundEvent::Violation(draft)).await,
                None => break,
            },
            event = queues.events.recv() => match event {
                Some(event) => process(index, &processor, event).await,
                None => break,
            },
            () = cancel.cancelled() => {
                queues.escalations.close();
                queues.events.close();
                while let Some(draft) = queues.escalations.recv().await {
                    process(index, &processor, InboundEvent::Violation(draft)).await;
                }
                while let Some(event) = queues.events.recv().await {
                    process(index, &processor, event).await;
                }
                break;
            }
        }
    }
    debug!("Partition {} stopped", index);
}

async fn process(index: usize, processor: &AccessEventProcessor, event: InboundEvent) {
    let digest = event.license_digest().to_string();
    if let Err(e) = processor.handle(event).await {
        warn!(
            "Partition {} failed to process event for license {}: {}",
            index, digest, e
        );
    }
}

fn partition(key: &str, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}
