//! Platform identifier → strategy lookup.

use crate::error::{DeployError, DeployResult};
use crate::strategy::DeploymentStrategy;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of deployment strategies keyed by lowercase platform id.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn DeploymentStrategy>>,
}

impl StrategyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `strategy` under its own platform id, replacing any
    /// previous registration.
    pub fn register(&mut self, strategy: Arc<dyn DeploymentStrategy>) {
        let id = normalize(strategy.platform());
        debug!("Registered deployment strategy: {}", id);
        self.strategies.insert(id, strategy);
    }

    /// Registers `strategy` under an explicit id, for one strategy type
    /// serving several platforms.
    pub fn register_as(&mut self, platform: &str, strategy: Arc<dyn DeploymentStrategy>) {
        let id = normalize(platform);
        debug!("Registered deployment strategy: {}", id);
        self.strategies.insert(id, strategy);
    }

    #[must_use]
    pub fn get(&self, platform: &str) -> Option<Arc<dyn DeploymentStrategy>> {
        self.strategies.get(&normalize(platform)).cloned()
    }

    /// Like [`get`](Self::get) but fails with `UnknownPlatform`.
    pub fn require(&self, platform: &str) -> DeployResult<Arc<dyn DeploymentStrategy>> {
        self.get(platform)
            .ok_or_else(|| DeployError::UnknownPlatform(platform.to_string()))
    }

    #[must_use]
    pub fn contains(&self, platform: &str) -> bool {
        self.strategies.contains_key(&normalize(platform))
    }

    /// Registered platform ids, sorted.
    #[must_use]
    pub fn platforms(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.strategies.keys().cloned().collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

pub(crate) fn normalize(platform: &str) -> String {
    platform.trim().to_ascii_lowercase()
}
