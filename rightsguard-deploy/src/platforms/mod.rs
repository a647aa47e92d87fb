//! Shared deployment strategies.

mod git_contents;
mod memory;
mod webhook;

pub use git_contents::{GitContentsConfig, GitContentsStrategy, GitDialect};
pub use memory::MemoryStrategy;
pub use webhook::{WebhookConfig, WebhookStrategy};

use crate::error::{DeployError, DeployResult};
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("rightsguard/", env!("CARGO_PKG_VERSION"));

fn http_client(timeout: Duration) -> DeployResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| DeployError::Config(format!("failed to create HTTP client: {e}")))
}

/// Turns a non-success response into `DeployError::Http`.
async fn check_status(response: reqwest::Response) -> DeployResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(DeployError::Http {
        status: status.as_u16(),
        message,
    })
}
