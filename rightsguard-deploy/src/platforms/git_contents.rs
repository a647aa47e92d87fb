//! Git hosting contents-API strategy.
//!
//! Publishes each artifact as a file commit through the repository
//! contents endpoint. GitHub and Gitea share the endpoint layout and
//! payloads and differ in three places:
//! - auth header: `Bearer <token>` vs `token <token>`
//! - file creation: `PUT` on GitHub, `POST` on Gitea (updates are `PUT`
//!   with the previous blob sha on both)
//! - GitHub wants its versioned `Accept` header

use super::{check_status, http_client};
use crate::error::{DeployError, DeployResult};
use crate::strategy::{DeployOptions, DeploymentOutcome, DeploymentStrategy, VerificationResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{Client, RequestBuilder, StatusCode};
use rightsguard_license::{ArtifactBundle, License, MANIFEST_FILE};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// API flavor of the git host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitDialect {
    #[default]
    Github,
    Gitea,
}

/// Configuration for one repository on one git host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitContentsConfig {
    /// Platform id this strategy registers under.
    pub platform: String,
    pub dialect: GitDialect,
    /// API root, e.g. `https://api.github.com` or
    /// `https://codeberg.org/api/v1`.
    pub base_url: String,
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Directory the license files are written under.
    pub path_prefix: String,
    pub timeout_secs: u64,
}

impl Default for GitContentsConfig {
    fn default() -> Self {
        Self {
            platform: "github".to_string(),
            dialect: GitDialect::Github,
            base_url: "https://api.github.com".to_string(),
            token: String::new(),
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            path_prefix: ".well-known/content-license".to_string(),
            timeout_secs: 30,
        }
    }
}

impl GitContentsConfig {
    /// GitHub (or GitHub Enterprise with a different `base_url`).
    pub fn github(owner: impl Into<String>, repo: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
            ..Self::default()
        }
    }

    /// Gitea-compatible host (Gitea, Forgejo, Codeberg).
    pub fn gitea(
        platform: impl Into<String>,
        base_url: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            dialect: GitDialect::Gitea,
            base_url: base_url.into(),
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentFile {
    sha: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: Option<WrittenFile>,
}

#[derive(Debug, Deserialize)]
struct WrittenFile {
    #[serde(default)]
    html_url: Option<String>,
}

/// Deploys license artifacts as files in a git repository.
pub struct GitContentsStrategy {
    config: GitContentsConfig,
    client: Client,
}

impl GitContentsStrategy {
    /// Creates the strategy.
    ///
    /// # Errors
    ///
    /// `Config` if owner or repo is empty or the HTTP client cannot be built.
    pub fn new(config: GitContentsConfig) -> DeployResult<Self> {
        if config.owner.is_empty() || config.repo.is_empty() {
            return Err(DeployError::Config(format!(
                "{}: owner and repo are required",
                config.platform
            )));
        }
        let client = http_client(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { config, client })
    }

    fn limit(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    fn file_path(&self, license: &License, name: &str) -> String {
        let prefix = self.config.path_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}/{}", license.id, name)
        } else {
            format!("{prefix}/{}/{name}", license.id)
        }
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            path
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.dialect {
            GitDialect::Github => request
                .bearer_auth(&self.config.token)
                .header("Accept", "application/vnd.github+json"),
            GitDialect::Gitea => {
                request.header("Authorization", format!("token {}", self.config.token))
            }
        }
    }

    /// Fetches an existing file, `None` if it does not exist.
    async fn fetch(&self, path: &str) -> DeployResult<Option<ContentFile>> {
        let response = self
            .authorize(self.client.get(self.contents_url(path)))
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await
            .map_err(|e| DeployError::from_reqwest(e, self.limit()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let file = check_status(response)
            .await?
            .json::<ContentFile>()
            .await
            .map_err(|e| DeployError::Protocol(format!("failed to parse contents response: {e}")))?;
        Ok(Some(file))
    }

    /// Creates or updates one file and returns its web URL when reported.
    async fn write(&self, path: &str, content: &[u8], message: &str) -> DeployResult<Option<String>> {
        let existing = self.fetch(path).await?;
        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content),
            "branch": self.config.branch,
        });
        let url = self.contents_url(path);
        let request = match (&existing, self.config.dialect) {
            (Some(file), _) => {
                body["sha"] = json!(file.sha);
                self.client.put(url)
            }
            (None, GitDialect::Github) => self.client.put(url),
            (None, GitDialect::Gitea) => self.client.post(url),
        };

        debug!(
            "{} {} on {} ({} bytes)",
            if existing.is_some() { "Updating" } else { "Creating" },
            path,
            self.config.platform,
            content.len()
        );

        let response = self
            .authorize(request)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeployError::from_reqwest(e, self.limit()))?;
        let written = check_status(response)
            .await?
            .json::<WriteResponse>()
            .await
            .map_err(|e| DeployError::Protocol(format!("failed to parse write response: {e}")))?;
        Ok(written.content.and_then(|c| c.html_url))
    }
}

#[async_trait]
impl DeploymentStrategy for GitContentsStrategy {
    fn platform(&self) -> &str {
        &self.config.platform
    }

    async fn deploy(
        &self,
        license: &License,
        options: &DeployOptions,
    ) -> DeployResult<DeploymentOutcome> {
        let bundle = ArtifactBundle::for_license(license)?;
        let message = options.message_for(license);

        let mut location = None;
        for artifact in &bundle.artifacts {
            let path = self.file_path(license, &artifact.name);
            let url = self.write(&path, &artifact.content, &message).await?;
            if artifact.name == MANIFEST_FILE {
                location = url;
            }
        }

        info!(
            "Published license {} to {}/{} on {}",
            license.id, self.config.owner, self.config.repo, self.config.platform
        );
        let outcome = DeploymentOutcome::deployed(&self.config.platform, bundle.names());
        Ok(match location {
            Some(url) => outcome.with_location(url),
            None => outcome,
        })
    }

    async fn verify(
        &self,
        license: &License,
        _outcome: &DeploymentOutcome,
    ) -> DeployResult<VerificationResult> {
        let path = self.file_path(license, MANIFEST_FILE);
        let Some(file) = self.fetch(&path).await? else {
            return Ok(VerificationResult::failed(format!("{path} not found")));
        };
        let Some(encoded) = file.content else {
            return Ok(VerificationResult::failed(format!("{path} has no content")));
        };

        // The API wraps base64 at 60 columns.
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = BASE64
            .decode(compact)
            .map_err(|e| DeployError::Protocol(format!("invalid base64 content: {e}")))?;
        let published: License = serde_json::from_slice(&bytes)
            .map_err(|e| DeployError::Protocol(format!("published manifest is not a license: {e}")))?;

        Ok(if published.digest == license.digest && published.id == license.id {
            VerificationResult::passed()
        } else {
            VerificationResult::failed(format!(
                "published digest {} does not match {}",
                published.digest, license.digest
            ))
        })
    }
}
