//! Violation handling for Rightsguard.
//!
//! - [`RecordStore`]: licenses, violations and the compliance log, backed by
//!   SQLite ([`SqliteStore`]) or memory ([`MemoryStore`])
//! - [`EventBus`]: topic publication, with an in-process [`MemoryBus`] and a
//!   log-only [`TracingBus`]
//! - [`ViolationPipeline`]: stores reported violations, publishes them and
//!   awaits the [`ImmediateResponder`] for high and critical severities
//! - [`PartitionedConsumer`]: inbound events routed to workers by license
//!   digest so each license sees its events in arrival order
//! - [`ComplianceMonitor`]: the scheduled expiry and integrity sweep

mod bus;
mod consumer;
mod error;
mod monitor;
mod pipeline;
mod record;
mod response;
mod store;

pub use bus::{BusMessage, EventBus, MemoryBus, Topic, TracingBus};
pub use consumer::{
    AccessEventProcessor, ConsumerConfig, ConsumerHandle, InboundEvent, PartitionedConsumer,
};
pub use error::{PipelineError, PipelineResult, StoreError, StoreResult};
pub use monitor::{ComplianceMonitor, CycleSummary, MonitorConfig};
pub use pipeline::{PipelineConfig, ViolationPipeline};
pub use record::{ComplianceLogEntry, StoredViolation};
pub use response::{ImmediateResponder, LogResponder, WebhookResponder};
pub use store::{MemoryStore, RecordStore, SqliteStore};
