//! Topic-based event publication.

use crate::error::PipelineResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Topics the pipeline publishes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    AccessEvents,
    Violations,
    PlatformMonitoring,
    TrainingAttempts,
    ComplianceAlerts,
    ImmediateResponse,
}

impl Topic {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AccessEvents => "access-events",
            Self::Violations => "violations",
            Self::PlatformMonitoring => "platform-monitoring",
            Self::TrainingAttempts => "training-attempts",
            Self::ComplianceAlerts => "compliance-alerts",
            Self::ImmediateResponse => "immediate-response",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published message. `key` is the ordering key, normally the license
/// digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub topic: Topic,
    pub key: String,
    pub payload: Value,
    pub published_at: DateTime<Utc>,
}

impl BusMessage {
    pub fn new(topic: Topic, key: impl Into<String>, payload: Value) -> Self {
        Self {
            topic,
            key: key.into(),
            payload,
            published_at: Utc::now(),
        }
    }
}

/// Publishes messages to a transport.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, message: BusMessage) -> PipelineResult<()>;
}

/// Bus that writes each message to the `rightsguard::bus` tracing target
/// and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingBus;

#[async_trait]
impl EventBus for TracingBus {
    async fn publish(&self, message: BusMessage) -> PipelineResult<()> {
        debug!(
            target: "rightsguard::bus",
            "{} [{}] {}", message.topic, message.key, message.payload
        );
        Ok(())
    }
}

/// In-process bus that keeps every message and can forward copies to a
/// channel.
#[derive(Default)]
pub struct MemoryBus {
    messages: Mutex<Vec<BusMessage>>,
    tap: Option<mpsc::UnboundedSender<BusMessage>>,
}

impl MemoryBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus that also forwards each message to the returned
    /// receiver.
    #[must_use]
    pub fn with_tap() -> (Self, mpsc::UnboundedReceiver<BusMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                messages: Mutex::default(),
                tap: Some(tx),
            },
            rx,
        )
    }

    /// Every message published so far.
    pub async fn messages(&self) -> Vec<BusMessage> {
        self.messages.lock().await.clone()
    }

    /// Messages published on `topic`.
    pub async fn on(&self, topic: Topic) -> Vec<BusMessage> {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn publish(&self, message: BusMessage) -> PipelineResult<()> {
        if let Some(tap) = &self.tap {
            // A dropped receiver only stops the forwarding.
            let _ = tap.send(message.clone());
        }
        self.messages.lock().await.push(message);
        Ok(())
    }
}
