//! Canonical serialization used only for digest computation.
//!
//! Produces compact JSON with object keys sorted by byte order at every
//! depth, so the output depends only on the record's values and never on
//! the order a caller inserted fields in. Key sorting is done here rather
//! than relying on `serde_json::Map` ordering, which flips to insertion
//! order when any crate in the build enables `preserve_order`.
//!
//! Floats are rejected: their textual form is not stable across
//! serializers, and no license field needs one.

use crate::error::{LicenseError, LicenseResult};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serializes `value` as canonical JSON bytes.
pub fn canonical_json(value: &Value) -> LicenseResult<Vec<u8>> {
    let mut out = Vec::with_capacity(256);
    write_value(value, &mut out)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut Vec<u8>) -> LicenseResult<()> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => {
            out.extend_from_slice(serde_json::to_string(value)?.as_bytes());
        }
        Value::Number(n) => {
            if n.is_f64() {
                return Err(LicenseError::Canonicalization(format!(
                    "float values are not canonical: {n}"
                )));
            }
            out.extend_from_slice(n.to_string().as_bytes());
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(serde_json::to_string(key)?.as_bytes());
                out.push(b':');
                write_value(&map[key], out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Digest of protected content. Only the digest is ever stored.
#[must_use]
pub fn content_digest(content: &[u8]) -> String {
    sha256_hex(content)
}
