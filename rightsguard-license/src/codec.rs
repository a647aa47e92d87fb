//! License records and the codec that seals and validates them.

use crate::canonical::{canonical_json, content_digest, sha256_hex};
use crate::error::{LicenseError, LicenseResult};
use crate::seal::{DigestChainSealer, IntegritySealer, SealScheme};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rightsguard_types::{LicenseId, LicenseStatus, LicenseType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Version of the canonical record layout.
pub const SCHEMA_VERSION: &str = "1.0";

/// A single restriction value. Restrictions are type-specific switches or
/// free-form notes (`ai_training: false`, `contact: "legal@..."`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RestrictionValue {
    Flag(bool),
    Text(String),
}

impl From<bool> for RestrictionValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for RestrictionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RestrictionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Restriction map. Keys are kept sorted so the record has one shape no
/// matter how it was assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Restrictions(BTreeMap<String, RestrictionValue>);

impl Restrictions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a restriction.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RestrictionValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builds restrictions from a JSON object, rejecting values that are
    /// neither booleans nor strings.
    pub fn from_json(value: &Value) -> LicenseResult<Self> {
        let Value::Object(map) = value else {
            return Err(LicenseError::InvalidInput(
                "restrictions must be a JSON object".to_string(),
            ));
        };
        let mut out = BTreeMap::new();
        for (key, v) in map {
            let rv = match v {
                Value::Bool(b) => RestrictionValue::Flag(*b),
                Value::String(s) => RestrictionValue::Text(s.clone()),
                other => {
                    return Err(LicenseError::InvalidRestriction {
                        key: key.clone(),
                        reason: format!("expected boolean or string, got {other}"),
                    });
                }
            };
            out.insert(key.clone(), rv);
        }
        Ok(Self(out))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RestrictionValue> {
        self.0.get(key)
    }

    /// Returns the boolean value of `key`, `None` if absent or not a flag.
    #[must_use]
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(RestrictionValue::Flag(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RestrictionValue)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Restrictions
where
    K: Into<String>,
    V: Into<RestrictionValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A sealed license record.
///
/// Fields are public so records can be moved through stores and buses as
/// plain data; any change to a sealed field is caught by
/// [`LicenseCodec::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: LicenseId,
    #[serde(rename = "type")]
    pub license_type: LicenseType,
    pub creator: String,
    pub content_digest: String,
    pub restrictions: Restrictions,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub schema_version: String,
    pub seal_scheme: SealScheme,
    pub digest: String,
    pub signature: String,
    #[serde(default)]
    pub status: LicenseStatus,
}

impl License {
    /// Status after applying expiry at `now`. Revocation always wins.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> LicenseStatus {
        match (self.status, self.expires_at) {
            (LicenseStatus::Active, Some(exp)) if now >= exp => LicenseStatus::Expired,
            (status, _) => status,
        }
    }

    /// Returns true if the license has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == LicenseStatus::Expired
    }

    /// Canonical view of the sealed fields.
    fn sealed_fields(&self) -> Value {
        json!({
            "id": self.id.to_string(),
            "type": self.license_type.as_str(),
            "creator": self.creator,
            "content_digest": self.content_digest,
            "restrictions": self.restrictions,
            "created_at": format_timestamp(&self.created_at),
            "expires_at": self.expires_at.as_ref().map(format_timestamp),
            "schema_version": self.schema_version,
            "seal_scheme": self.seal_scheme.as_str(),
        })
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generates and validates sealed licenses.
#[derive(Clone)]
pub struct LicenseCodec {
    sealer: Arc<dyn IntegritySealer>,
}

impl Default for LicenseCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LicenseCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseCodec")
            .field("scheme", &self.sealer.scheme())
            .finish()
    }
}

impl LicenseCodec {
    /// Creates a codec using the digest-chain sealer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sealer(Arc::new(DigestChainSealer))
    }

    /// Creates a codec using a specific sealer.
    #[must_use]
    pub fn with_sealer(sealer: Arc<dyn IntegritySealer>) -> Self {
        Self { sealer }
    }

    /// The scheme this codec seals and validates under.
    #[must_use]
    pub fn scheme(&self) -> SealScheme {
        self.sealer.scheme()
    }

    /// Generates a sealed license stamped with the current time.
    ///
    /// # Errors
    ///
    /// `UnsupportedType` if `license_type` is not one of the closed set,
    /// `InvalidInput` for an empty creator or an expiry not after creation.
    pub fn generate(
        &self,
        license_type: &str,
        creator: &str,
        content: &[u8],
        restrictions: Restrictions,
        expires_at: Option<DateTime<Utc>>,
    ) -> LicenseResult<License> {
        self.generate_at(
            license_type,
            creator,
            content,
            restrictions,
            expires_at,
            Utc::now(),
        )
    }

    /// Generates a sealed license with an explicit creation time.
    pub fn generate_at(
        &self,
        license_type: &str,
        creator: &str,
        content: &[u8],
        restrictions: Restrictions,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> LicenseResult<License> {
        let license_type: LicenseType = license_type.parse()?;
        if creator.trim().is_empty() {
            return Err(LicenseError::InvalidInput("creator must not be empty".into()));
        }
        if creator.chars().any(char::is_control) {
            return Err(LicenseError::InvalidInput(
                "creator must not contain control characters".into(),
            ));
        }

        // Canonical timestamps carry millisecond precision.
        let created_at = now.trunc_subsecs(3);
        let expires_at = expires_at.map(|t| t.trunc_subsecs(3));
        if let Some(exp) = expires_at {
            if exp <= created_at {
                return Err(LicenseError::InvalidInput(
                    "expiration must be after creation".into(),
                ));
            }
        }

        let mut license = License {
            id: LicenseId::new(),
            license_type,
            creator: creator.to_string(),
            content_digest: content_digest(content),
            restrictions,
            created_at,
            expires_at,
            schema_version: SCHEMA_VERSION.to_string(),
            seal_scheme: self.sealer.scheme(),
            digest: String::new(),
            signature: String::new(),
            status: LicenseStatus::Active,
        };

        let (digest, signature) = self.seal(&license)?;
        license.digest = digest;
        license.signature = signature;

        debug!(
            "Generated {} license {} (digest {})",
            license.license_type, license.id, license.digest
        );
        Ok(license)
    }

    /// Returns true if the stored digest and signature match the values
    /// recomputed from the record's own fields.
    ///
    /// Never fails: a mismatch, an unknown scheme or an unserializable record
    /// all yield `false`.
    #[must_use]
    pub fn validate(&self, license: &License) -> bool {
        if license.seal_scheme != self.sealer.scheme() {
            return false;
        }
        let Ok(canonical) = Self::canonical_bytes(license) else {
            return false;
        };
        let digest = sha256_hex(&canonical);
        if digest != license.digest {
            return false;
        }
        self.sealer
            .verify(&seal_message(&canonical, &digest), &license.signature)
    }

    /// Validates an untyped record, e.g. one read back from a platform.
    /// Missing fields or malformed structure yield `false`.
    #[must_use]
    pub fn validate_json(&self, record: &Value) -> bool {
        match serde_json::from_value::<License>(record.clone()) {
            Ok(license) => self.validate(&license),
            Err(_) => false,
        }
    }

    /// Canonical bytes the digest is computed over.
    pub fn canonical_bytes(license: &License) -> LicenseResult<Vec<u8>> {
        canonical_json(&license.sealed_fields())
    }

    /// Integrity digest recomputed from the record's sealed fields.
    pub fn digest_of(license: &License) -> LicenseResult<String> {
        Ok(sha256_hex(&Self::canonical_bytes(license)?))
    }

    fn seal(&self, license: &License) -> LicenseResult<(String, String)> {
        let canonical = Self::canonical_bytes(license)?;
        let digest = sha256_hex(&canonical);
        let signature = self.sealer.sign(&seal_message(&canonical, &digest))?;
        Ok((digest, signature))
    }
}

fn seal_message(canonical: &[u8], digest: &str) -> Vec<u8> {
    let mut message = Vec::with_capacity(canonical.len() + digest.len());
    message.extend_from_slice(canonical);
    message.extend_from_slice(digest.as_bytes());
    message
}
