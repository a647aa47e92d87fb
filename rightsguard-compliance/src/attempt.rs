//! Access attempts: ephemeral descriptions of someone using licensed content.

use serde::{Deserialize, Serialize};

/// Boolean claims carried by an attempt. An absent claim is `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Claims {
    pub attribution_provided: bool,
    pub nda_signed: bool,
    pub pre_approved: bool,
    pub commercial_intent: bool,
}

/// One attempt to access licensed content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessAttempt {
    /// Platform the access happened on (`github`, `youtube`, ...).
    #[serde(default)]
    pub platform: String,
    /// Free-form purpose tag (`ai-training`, `commercial`, `research`).
    #[serde(default)]
    pub purpose: String,
    /// Who accessed the content (crawler user agent, account, IP range).
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub claims: Claims,
}

impl AccessAttempt {
    /// Creates an attempt with the given purpose and no claims.
    pub fn for_purpose(purpose: impl Into<String>) -> Self {
        Self {
            purpose: purpose.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn on_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    #[must_use]
    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    #[must_use]
    pub fn with_claims(mut self, claims: Claims) -> Self {
        self.claims = claims;
        self
    }

    /// Purpose tag normalized for matching: trimmed, lowercase, `_` as `-`.
    #[must_use]
    pub fn normalized_purpose(&self) -> String {
        self.purpose.trim().to_ascii_lowercase().replace('_', "-")
    }
}
