//! Generic webhook strategy: POST the license, GET it back to verify.

use super::{check_status, http_client};
use crate::error::{DeployError, DeployResult};
use crate::strategy::{DeployOptions, DeploymentOutcome, DeploymentStrategy, VerificationResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rightsguard_license::{broadcast_headers, ArtifactBundle, License};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

/// Webhook endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub platform: String,
    /// URL the license is POSTed to.
    pub endpoint: String,
    /// URL to GET the published record from. `{license_id}` and `{digest}`
    /// are substituted. Defaults to `<endpoint>/{license_id}`.
    pub verify_url: Option<String>,
    /// Bearer token sent with every request.
    pub auth_token: Option<String>,
    /// Extra static headers.
    pub headers: BTreeMap<String, String>,
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            platform: "webhook".to_string(),
            endpoint: String::new(),
            verify_url: None,
            auth_token: None,
            headers: BTreeMap::new(),
            timeout_secs: 30,
        }
    }
}

impl WebhookConfig {
    pub fn new(platform: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct Receipt {
    #[serde(default, alias = "location")]
    url: Option<String>,
}

/// Deploys a license by POSTing it to an HTTP endpoint.
pub struct WebhookStrategy {
    config: WebhookConfig,
    client: Client,
}

impl WebhookStrategy {
    pub fn new(config: WebhookConfig) -> DeployResult<Self> {
        if config.endpoint.is_empty() {
            return Err(DeployError::Config(format!(
                "{}: endpoint is required",
                config.platform
            )));
        }
        let client = http_client(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { config, client })
    }

    fn limit(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    fn verify_url(&self, license: &License) -> String {
        match &self.config.verify_url {
            Some(template) => template
                .replace("{license_id}", &license.id.to_string())
                .replace("{digest}", &license.digest),
            None => format!("{}/{}", self.config.endpoint.trim_end_matches('/'), license.id),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = self
            .config
            .headers
            .iter()
            .fold(builder, |b, (name, value)| b.header(name, value));
        match &self.config.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl DeploymentStrategy for WebhookStrategy {
    fn platform(&self) -> &str {
        &self.config.platform
    }

    async fn deploy(
        &self,
        license: &License,
        options: &DeployOptions,
    ) -> DeployResult<DeploymentOutcome> {
        let bundle = ArtifactBundle::for_license(license)?;
        let artifacts: Vec<Value> = bundle
            .artifacts
            .iter()
            .map(|a| {
                json!({
                    "name": a.name,
                    "media_type": a.media_type,
                    "content": String::from_utf8_lossy(&a.content),
                })
            })
            .collect();
        let headers: Map<String, Value> = broadcast_headers(license)
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        let body = json!({
            "event": "license.published",
            "message": options.message_for(license),
            "license": license,
            "artifacts": artifacts,
            "headers": headers,
        });

        let response = self
            .request(self.client.post(&self.config.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| DeployError::from_reqwest(e, self.limit()))?;
        let response = check_status(response).await?;

        // Receivers may answer with an empty body.
        let receipt = response
            .json::<Receipt>()
            .await
            .unwrap_or(Receipt { url: None });

        info!("Posted license {} to {}", license.id, self.config.platform);
        let outcome = DeploymentOutcome::deployed(&self.config.platform, bundle.names());
        Ok(match receipt.url {
            Some(url) => outcome.with_location(url),
            None => outcome,
        })
    }

    async fn verify(
        &self,
        license: &License,
        _outcome: &DeploymentOutcome,
    ) -> DeployResult<VerificationResult> {
        let url = self.verify_url(license);
        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|e| DeployError::from_reqwest(e, self.limit()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(VerificationResult::failed(format!("{url} not found")));
        }
        let record: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| DeployError::Protocol(format!("verification response is not JSON: {e}")))?;

        let digest = record
            .get("digest")
            .or_else(|| record.get("license").and_then(|l| l.get("digest")))
            .and_then(Value::as_str);
        Ok(match digest {
            Some(d) if d == license.digest => VerificationResult::passed(),
            Some(d) => VerificationResult::failed(format!(
                "published digest {d} does not match {}",
                license.digest
            )),
            None => VerificationResult::failed("verification response has no digest"),
        })
    }
}
