//! Violation intake: store, publish, respond.

use crate::bus::{BusMessage, EventBus, Topic};
use crate::error::{PipelineError, PipelineResult};
use crate::record::StoredViolation;
use crate::response::{ImmediateResponder, LogResponder};
use crate::store::RecordStore;
use chrono::Utc;
use rightsguard_types::{
    MetricEvent, NoopRecorder, Recorder, ResolutionStatus, ViolationDraft, ViolationId,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How long `report` waits for the immediate responder.
    pub response_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            response_timeout_secs: 10,
        }
    }
}

/// Receives violation reports and drives their resolution status.
pub struct ViolationPipeline {
    store: Arc<dyn RecordStore>,
    bus: Arc<dyn EventBus>,
    responder: Arc<dyn ImmediateResponder>,
    recorder: Arc<dyn Recorder>,
    config: PipelineConfig,
}

impl ViolationPipeline {
    /// Creates a pipeline that logs immediate responses.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, bus: Arc<dyn EventBus>) -> Self {
        Self {
            store,
            bus,
            responder: Arc::new(LogResponder),
            recorder: Arc::new(NoopRecorder),
            config: PipelineConfig::default(),
        }
    }

    #[must_use]
    pub fn with_responder(mut self, responder: Arc<dyn ImmediateResponder>) -> Self {
        self.responder = responder;
        self
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn Recorder>) -> Self {
        self.recorder = recorder;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn bus(&self) -> &Arc<dyn EventBus> {
        &self.bus
    }

    /// Stores and publishes a violation.
    ///
    /// High and critical violations are not returned until the immediate
    /// responder has run (or timed out). A draft whose id is already stored
    /// returns the stored record without publishing or responding again.
    pub async fn report(&self, draft: ViolationDraft) -> PipelineResult<StoredViolation> {
        let id = draft.id.unwrap_or_default();
        if let Some(existing) = self.store.violation(id)? {
            debug!("Violation {} already recorded", id);
            return Ok(existing);
        }

        let record = StoredViolation::from_draft(draft, id, Utc::now());
        if !self.store.insert_violation(&record)? {
            // Lost a race with a concurrent report of the same id.
            return self.store.violation(id)?.ok_or(PipelineError::NotFound(id));
        }

        info!(
            "Recorded {} violation {} ({}) on {} for license {}",
            record.severity, record.id, record.kind, record.platform, record.license_digest
        );
        self.recorder.record(MetricEvent::ViolationReported {
            kind: record.kind.clone(),
            severity: record.severity,
        });
        self.publish(Topic::Violations, &record.license_digest, json!(record))
            .await;

        if record.severity.requires_immediate_response() {
            self.trigger_response(&record).await;
        }
        Ok(record)
    }

    async fn trigger_response(&self, record: &StoredViolation) {
        self.publish(
            Topic::ImmediateResponse,
            &record.license_digest,
            json!({"violation_id": record.id, "severity": record.severity, "kind": record.kind}),
        )
        .await;

        let limit = Duration::from_secs(self.config.response_timeout_secs);
        let succeeded = match tokio::time::timeout(limit, self.responder.respond(record)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Immediate response for {} failed: {}", record.id, e);
                false
            }
            Err(_) => {
                warn!("Immediate response for {} timed out after {:?}", record.id, limit);
                false
            }
        };
        self.recorder.record(MetricEvent::ResponseTriggered {
            severity: record.severity,
            succeeded,
        });
    }

    /// Moves a violation to `next`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidTransition` when `next` is not
    /// reachable from the current status, `Conflict` when the status
    /// changed concurrently.
    pub async fn update_status(
        &self,
        id: ViolationId,
        next: ResolutionStatus,
    ) -> PipelineResult<StoredViolation> {
        let current = self.store.violation(id)?.ok_or(PipelineError::NotFound(id))?;
        if !current.status.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }
        if current.status == next {
            return Ok(current);
        }

        let now = Utc::now();
        if !self
            .store
            .update_violation_status(id, current.status, next, now)?
        {
            return Err(PipelineError::Conflict {
                id,
                expected: current.status,
            });
        }

        info!("Violation {} moved from {} to {}", id, current.status, next);
        self.publish(
            Topic::Violations,
            &current.license_digest,
            json!({"violation_id": id, "status": next, "previous": current.status}),
        )
        .await;

        Ok(StoredViolation {
            status: next,
            updated_at: now,
            ..current
        })
    }

    /// Violations recorded for a license.
    pub fn violations_for(&self, license_digest: &str) -> PipelineResult<Vec<StoredViolation>> {
        Ok(self.store.violations_for(license_digest)?)
    }

    /// Publishes on `topic`. Bus failures are logged, never returned.
    pub(crate) async fn publish(&self, topic: Topic, key: &str, payload: serde_json::Value) {
        if let Err(e) = self.bus.publish(BusMessage::new(topic, key, payload)).await {
            warn!("Failed to publish to {}: {}", topic, e);
        }
    }
}
