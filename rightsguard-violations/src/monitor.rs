//! Scheduled compliance monitoring over stored licenses.

use crate::bus::Topic;
use crate::error::PipelineResult;
use crate::pipeline::ViolationPipeline;
use chrono::{DateTime, Utc};
use rightsguard_compliance::INTEGRITY_REASON;
use rightsguard_license::LicenseCodec;
use rightsguard_types::{
    LicenseStatus, MetricEvent, NoopRecorder, Recorder, Severity, ViolationDraft, ViolationKind,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Platform and source recorded on violations the monitor raises.
const MONITOR_PLATFORM: &str = "rightsguard";
const MONITOR_SOURCE: &str = "compliance-monitor";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between cycles.
    pub interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

impl MonitorConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// What one cycle found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub licenses: usize,
    /// Licenses moved to expired during this cycle.
    pub expired: usize,
    /// Licenses failing integrity validation.
    pub tampered: usize,
    /// Integrity violations newly reported this cycle.
    pub reported: usize,
    pub completed_at: DateTime<Utc>,
}

/// Periodic sweep: expires licenses by time and re-validates integrity.
pub struct ComplianceMonitor {
    pipeline: Arc<ViolationPipeline>,
    codec: LicenseCodec,
    recorder: Arc<dyn Recorder>,
}

impl ComplianceMonitor {
    #[must_use]
    pub fn new(pipeline: Arc<ViolationPipeline>, codec: LicenseCodec) -> Self {
        Self {
            pipeline,
            codec,
            recorder: Arc::new(NoopRecorder),
        }
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn Recorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Runs one monitoring cycle.
    ///
    /// A tampered license gets one critical `integrity_violation`: it is
    /// not re-reported while an unresolved one exists.
    pub async fn run_cycle(&self) -> PipelineResult<CycleSummary> {
        let now = Utc::now();
        let store = self.pipeline.store();
        let licenses = store.licenses()?;
        let mut expired = 0;
        let mut tampered = 0;
        let mut reported = 0;

        for license in &licenses {
            if !self.codec.validate(license) {
                tampered += 1;
                let already_open = store
                    .violations_for(&license.digest)?
                    .iter()
                    .any(|v| v.kind == ViolationKind::IntegrityViolation && !v.status.is_terminal());
                if already_open {
                    continue;
                }
                warn!("Stored license {} failed integrity validation", license.id);
                let draft = ViolationDraft::new(
                    ViolationKind::IntegrityViolation,
                    &license.digest,
                    MONITOR_PLATFORM,
                    MONITOR_SOURCE,
                )
                .with_severity(Severity::Critical)
                .with_details(json!({
                    "reason": INTEGRITY_REASON,
                    "license_id": license.id,
                    "recomputed_digest": LicenseCodec::digest_of(license).ok(),
                }));
                self.pipeline.report(draft).await?;
                reported += 1;
                continue;
            }

            if license.status == LicenseStatus::Active
                && license.is_expired_at(now)
                && store.set_license_status(&license.digest, LicenseStatus::Expired)?
            {
                debug!("License {} expired", license.id);
                expired += 1;
            }
        }

        let summary = CycleSummary {
            licenses: licenses.len(),
            expired,
            tampered,
            reported,
            completed_at: Utc::now(),
        };
        self.pipeline
            .publish(Topic::PlatformMonitoring, "monitor", json!(summary))
            .await;
        self.recorder.record(MetricEvent::MonitorCycle {
            licenses: summary.licenses,
            expired,
            tampered,
        });
        info!(
            "Monitor cycle: {} licenses, {} expired, {} tampered",
            summary.licenses, expired, tampered
        );
        Ok(summary)
    }

    /// Runs a cycle every `interval` until `cancel` fires. The first cycle
    /// runs immediately.
    pub fn spawn(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("Compliance monitor stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_cycle().await {
                            warn!("Monitor cycle failed: {}", e);
                        }
                    }
                }
            }
        })
    }
}
