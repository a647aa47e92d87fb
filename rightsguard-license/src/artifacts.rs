//! Public artifacts derived from a license.
//!
//! Every renderer here is a pure function of a [`License`]:
//! - a robots-style crawler directive
//! - a schema.org `CreativeWork` JSON-LD metadata block
//! - a broadcast header set for HTTP responses and media streams
//! - the license record itself as a JSON manifest
//!
//! Deployment strategies publish the [`ArtifactBundle`] built from these.

use crate::codec::{License, RestrictionValue};
use crate::error::LicenseResult;
use chrono::SecondsFormat;
use rightsguard_types::LicenseType;
use serde_json::{json, Map, Value};
use std::fmt::Write as _;

/// User agents of crawlers that collect AI training data.
pub const AI_CRAWLERS: &[&str] = &[
    "GPTBot",
    "ChatGPT-User",
    "CCBot",
    "Google-Extended",
    "anthropic-ai",
    "ClaudeBot",
    "PerplexityBot",
    "Bytespider",
    "Amazonbot",
    "Applebot-Extended",
    "FacebookBot",
    "cohere-ai",
    "Diffbot",
    "Omgilibot",
];

/// File names used for each artifact.
pub const DIRECTIVE_FILE: &str = "ai-license.txt";
pub const METADATA_FILE: &str = "license.jsonld";
pub const HEADERS_FILE: &str = "license-headers.txt";
pub const MANIFEST_FILE: &str = "license.json";

/// A rendered artifact ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name relative to the platform's license directory.
    pub name: String,
    /// MIME type.
    pub media_type: &'static str,
    pub content: Vec<u8>,
}

/// All artifacts for one license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactBundle {
    pub artifacts: Vec<Artifact>,
}

impl ArtifactBundle {
    /// Renders the full artifact set for `license`.
    pub fn for_license(license: &License) -> LicenseResult<Self> {
        let headers = broadcast_headers(license)
            .into_iter()
            .fold(String::new(), |mut acc, (name, value)| {
                let _ = writeln!(acc, "{name}: {value}");
                acc
            });

        Ok(Self {
            artifacts: vec![
                Artifact {
                    name: MANIFEST_FILE.to_string(),
                    media_type: "application/json",
                    content: manifest(license)?,
                },
                Artifact {
                    name: DIRECTIVE_FILE.to_string(),
                    media_type: "text/plain",
                    content: crawler_directive(license).into_bytes(),
                },
                Artifact {
                    name: METADATA_FILE.to_string(),
                    media_type: "application/ld+json",
                    content: serde_json::to_vec_pretty(&metadata_block(license))?,
                },
                Artifact {
                    name: HEADERS_FILE.to_string(),
                    media_type: "text/plain",
                    content: headers.into_bytes(),
                },
            ],
        })
    }

    /// Artifact names in publication order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.artifacts.iter().map(|a| a.name.clone()).collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }
}

/// The license record as pretty JSON.
pub fn manifest(license: &License) -> LicenseResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(license)?)
}

/// Robots-style crawler directive.
///
/// do-not-train licenses disallow every known AI crawler; NDA and
/// pre-clearance licenses disallow all crawling; the remaining types allow
/// crawling and state their terms in comments.
#[must_use]
pub fn crawler_directive(license: &License) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Content license: {}", license.license_type.title());
    let _ = writeln!(out, "# License-Id: {}", license.id);
    let _ = writeln!(out, "# License-Digest: {}", license.digest);
    let _ = writeln!(out, "# Creator: {}", comment_text(&license.creator));
    if let Some(exp) = license.expires_at {
        let _ = writeln!(
            out,
            "# Expires: {}",
            exp.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }
    out.push('\n');

    match license.license_type {
        LicenseType::DoNotTrain => {
            for agent in AI_CRAWLERS {
                let _ = writeln!(out, "User-agent: {agent}\nDisallow: /\n");
            }
            out.push_str("User-agent: *\nAllow: /\n");
        }
        LicenseType::NdaEnforcement | LicenseType::PreClearance => {
            out.push_str("User-agent: *\nDisallow: /\n");
        }
        LicenseType::CommercialRestrictions => {
            out.push_str("# Commercial use is not permitted.\nUser-agent: *\nAllow: /\n");
        }
        LicenseType::AttributionRequired => {
            let _ = writeln!(
                out,
                "# Any use must credit {}.\nUser-agent: *\nAllow: /",
                comment_text(&license.creator)
            );
        }
    }
    out
}

/// Flattens control characters so interpolated text stays inside its
/// `#` comment line.
fn comment_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// schema.org `CreativeWork` JSON-LD block.
#[must_use]
pub fn metadata_block(license: &License) -> Value {
    let restrictions: Vec<Value> = license
        .restrictions
        .iter()
        .map(|(name, value)| {
            let value = match value {
                RestrictionValue::Flag(b) => json!(b),
                RestrictionValue::Text(s) => json!(s),
            };
            json!({"@type": "PropertyValue", "name": name, "value": value})
        })
        .collect();

    let mut block = Map::new();
    block.insert("@context".into(), json!("https://schema.org"));
    block.insert("@type".into(), json!("CreativeWork"));
    block.insert("identifier".into(), json!(license.id.to_string()));
    block.insert(
        "copyrightHolder".into(),
        json!({"@type": "Person", "name": license.creator}),
    );
    block.insert(
        "usageInfo".into(),
        json!(format!("{}: {}", license.license_type.as_str(), usage_summary(license.license_type))),
    );
    block.insert(
        "dateCreated".into(),
        json!(license.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    if let Some(exp) = license.expires_at {
        block.insert(
            "expires".into(),
            json!(exp.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
    }
    block.insert("sha256".into(), json!(license.content_digest));
    block.insert("additionalProperty".into(), Value::Array(restrictions));
    block.insert(
        "license".into(),
        json!({
            "@type": "DigitalDocument",
            "name": license.license_type.title(),
            "encodingFormat": "application/json",
            "identifier": license.digest,
        }),
    );
    Value::Object(block)
}

/// The JSON-LD block wrapped in a `<script>` tag for embedding in HTML.
pub fn metadata_script_tag(license: &License) -> LicenseResult<String> {
    let body = serde_json::to_string(&metadata_block(license))?;
    // A literal `</` would close the script element early.
    let body = body.replace("</", "<\\/");
    Ok(format!("<script type=\"application/ld+json\">{body}</script>"))
}

/// Header set attached to responses or broadcast streams serving the content.
#[must_use]
pub fn broadcast_headers(license: &License) -> Vec<(String, String)> {
    let mut headers = vec![
        ("X-Content-License".to_string(), license.license_type.as_str().to_string()),
        ("X-License-Id".to_string(), license.id.to_string()),
        ("X-License-Digest".to_string(), license.digest.clone()),
        ("X-License-Signature".to_string(), license.signature.clone()),
        ("X-License-Scheme".to_string(), license.seal_scheme.as_str().to_string()),
        ("X-Content-Digest".to_string(), license.content_digest.clone()),
    ];
    if let Some(exp) = license.expires_at {
        headers.push((
            "X-License-Expires".to_string(),
            exp.to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
    }
    match license.license_type {
        LicenseType::DoNotTrain => {
            headers.push(("X-Robots-Tag".to_string(), "noai, noimageai".to_string()));
        }
        LicenseType::NdaEnforcement | LicenseType::PreClearance => {
            headers.push((
                "X-Robots-Tag".to_string(),
                "noindex, nofollow, noarchive".to_string(),
            ));
        }
        LicenseType::CommercialRestrictions | LicenseType::AttributionRequired => {}
    }
    headers
}

fn usage_summary(license_type: LicenseType) -> &'static str {
    match license_type {
        LicenseType::DoNotTrain => "use for AI or machine-learning training is prohibited",
        LicenseType::CommercialRestrictions => "commercial use is prohibited",
        LicenseType::AttributionRequired => "use requires attribution to the creator",
        LicenseType::NdaEnforcement => "access requires a signed non-disclosure agreement",
        LicenseType::PreClearance => "use requires prior clearance from the creator",
    }
}
