//! Service configuration loaded from TOML.
//!
//! Every section has defaults, so an empty or missing file yields a working
//! single-node setup: digest-chain sealing, an in-memory SQLite store, no
//! remote platforms and log-only immediate responses.

use rightsguard_deploy::platforms::{GitContentsConfig, WebhookConfig};
use rightsguard_deploy::OrchestratorConfig;
use rightsguard_license::{Ed25519Sealer, LicenseCodec, SealScheme};
use rightsguard_violations::{ConsumerConfig, MonitorConfig, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub signing: SigningConfig,
    pub storage: StorageConfig,
    pub orchestrator: OrchestratorConfig,
    pub pipeline: PipelineConfig,
    pub consumer: ConsumerConfig,
    pub monitor: MonitorConfig,
    pub response: ResponseConfig,
    pub platforms: PlatformsConfig,
    pub logging: LoggingConfig,
}

/// How licenses are sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub scheme: SealScheme,
    /// Hex-encoded 32-byte Ed25519 seed.
    pub seed_hex: Option<String>,
    /// Environment variable holding the seed, read when `seed_hex` is unset.
    pub seed_env: Option<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            scheme: SealScheme::Sha256Chain,
            seed_hex: None,
            seed_env: None,
        }
    }
}

impl SigningConfig {
    /// Builds the codec for the configured scheme.
    ///
    /// # Errors
    ///
    /// `Invalid` when the Ed25519 scheme is selected without a usable seed.
    pub fn codec(&self) -> ConfigResult<LicenseCodec> {
        match self.scheme {
            SealScheme::Sha256Chain => Ok(LicenseCodec::new()),
            SealScheme::Ed25519 => {
                let seed = match (&self.seed_hex, &self.seed_env) {
                    (Some(hex), _) => hex.clone(),
                    (None, Some(var)) => std::env::var(var).map_err(|_| {
                        ConfigError::Invalid(format!("signing seed variable {var} is not set"))
                    })?,
                    (None, None) => {
                        return Err(ConfigError::Invalid(
                            "ed25519 signing requires seed_hex or seed_env".to_string(),
                        ));
                    }
                };
                let sealer = Ed25519Sealer::from_seed_hex(&seed)
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?;
                Ok(LicenseCodec::with_sealer(Arc::new(sealer)))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file. In-memory when unset.
    pub path: Option<PathBuf>,
}

/// Where high and critical violations are pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Webhook for immediate responses. Responses are only logged when unset.
    pub webhook_url: Option<String>,
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            auth_token: None,
            timeout_secs: 10,
        }
    }
}

impl ResponseConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Deployment targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformsConfig {
    pub git: Vec<GitContentsConfig>,
    pub webhook: Vec<WebhookConfig>,
    /// Platform ids served by in-process stores.
    pub memory: Vec<String>,
}

impl PlatformsConfig {
    /// Every configured platform id, in declaration order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.git
            .iter()
            .map(|g| g.platform.as_str())
            .chain(self.webhook.iter().map(|w| w.platform.as_str()))
            .chain(self.memory.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl GuardConfig {
    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults; unreadable or malformed content is
    /// an error.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks constraints serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.orchestrator.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "orchestrator.max_concurrency must be at least 1".to_string(),
            ));
        }
        let timeouts = [
            ("orchestrator.timeout_secs", self.orchestrator.timeout_secs),
            ("pipeline.response_timeout_secs", self.pipeline.response_timeout_secs),
            ("response.timeout_secs", self.response.timeout_secs),
        ];
        let platform_timeouts = self
            .platforms
            .git
            .iter()
            .map(|g| (g.platform.as_str(), g.timeout_secs))
            .chain(
                self.platforms
                    .webhook
                    .iter()
                    .map(|w| (w.platform.as_str(), w.timeout_secs)),
            );
        for (name, secs) in timeouts.into_iter().chain(platform_timeouts) {
            if secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{name}: timeout_secs must be at least 1"
                )));
            }
        }
        if self.consumer.partitions == 0 || self.consumer.queue_depth == 0 {
            return Err(ConfigError::Invalid(
                "consumer.partitions and consumer.queue_depth must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for id in self.platforms.ids() {
            let key = id.trim().to_lowercase();
            if key.is_empty() {
                return Err(ConfigError::Invalid("platform id must not be empty".to_string()));
            }
            if !seen.insert(key) {
                return Err(ConfigError::Invalid(format!("duplicate platform id: {id}")));
            }
        }
        Ok(())
    }
}
