//! Immediate-response actions for high and critical violations.

use crate::error::{PipelineError, PipelineResult};
use crate::record::StoredViolation;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

/// Acts on a violation severe enough to need a response before the
/// report returns.
#[async_trait]
pub trait ImmediateResponder: Send + Sync {
    async fn respond(&self, violation: &StoredViolation) -> PipelineResult<()>;
}

/// Logs the violation at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogResponder;

#[async_trait]
impl ImmediateResponder for LogResponder {
    async fn respond(&self, violation: &StoredViolation) -> PipelineResult<()> {
        warn!(
            "Immediate response: {} {} violation {} on {} by {} (license {})",
            violation.severity,
            violation.kind,
            violation.id,
            violation.platform,
            violation.source,
            violation.license_digest
        );
        Ok(())
    }
}

/// POSTs the violation to an alerting endpoint.
pub struct WebhookResponder {
    client: Client,
    url: String,
    auth_token: Option<String>,
}

impl WebhookResponder {
    pub fn new(url: impl Into<String>, timeout: Duration) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Response(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            auth_token: None,
        })
    }

    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

#[async_trait]
impl ImmediateResponder for WebhookResponder {
    async fn respond(&self, violation: &StoredViolation) -> PipelineResult<()> {
        let body = json!({
            "event": "violation.detected",
            "violation": violation,
        });
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::Response(format!("alert delivery failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(PipelineError::Response(format!(
                "alert endpoint returned {status}: {error}"
            )));
        }
        info!("Delivered alert for violation {}", violation.id);
        Ok(())
    }
}
