//! License generation and validation for Rightsguard.
//!
//! This crate handles:
//! - Building license records for one of the closed license types
//! - Canonical serialization independent of field insertion order
//! - Integrity digest + signature ("seal") computation
//! - Tamper detection by recomputing the seal from the record's own fields
//! - Rendering the public artifacts derived from a license (crawler
//!   directive, JSON-LD metadata block, broadcast headers)
//!
//! # Seal Format
//!
//! - `digest = hex(sha256(canonical))`
//! - `signature = sealer.sign(canonical || digest)`
//!
//! where `canonical` is the sorted-key compact JSON of every field except
//! `digest`, `signature` and the lifecycle `status`.

pub mod artifacts;
mod canonical;
mod codec;
mod error;
mod seal;

pub use artifacts::{
    broadcast_headers, crawler_directive, manifest, metadata_block, metadata_script_tag, Artifact,
    ArtifactBundle, AI_CRAWLERS, DIRECTIVE_FILE, HEADERS_FILE, MANIFEST_FILE, METADATA_FILE,
};
pub use canonical::{canonical_json, content_digest, sha256_hex};
pub use codec::{License, LicenseCodec, RestrictionValue, Restrictions, SCHEMA_VERSION};
pub use error::{LicenseError, LicenseResult};
pub use seal::{
    generate_seed, DigestChainSealer, Ed25519Sealer, Ed25519Verifier, IntegritySealer, SealScheme,
};
