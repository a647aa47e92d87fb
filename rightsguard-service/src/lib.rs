//! Rightsguard service wiring.
//!
//! Loads [`GuardConfig`] from TOML, installs logging, and assembles the
//! codec, store, orchestrator, violation pipeline, consumer and monitor
//! into one [`Rightsguard`] handle.

pub mod config;
pub mod logging;
mod service;

pub use config::{
    ConfigError, ConfigResult, GuardConfig, LoggingConfig, PlatformsConfig, ResponseConfig,
    SigningConfig, StorageConfig,
};
pub use logging::{init_tracing, LogFilterHandle};
pub use service::{Components, IssueRequest, Issued, Rightsguard, ServiceError, ServiceResult};
