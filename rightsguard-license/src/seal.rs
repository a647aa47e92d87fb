//! Signature schemes applied over `canonical || digest`.
//!
//! Two schemes are available:
//! - `sha256-chain`: the signature is a second SHA-256 over the canonical
//!   bytes followed by the digest. It adds no authenticity beyond the digest
//!   itself (anyone can recompute it) and exists for interoperability with
//!   records issued under that scheme.
//! - `ed25519`: an Ed25519 signature by the issuer's key. Records can be
//!   verified with the public key alone.
//!
//! The scheme is part of the sealed record, so a license sealed under one
//! scheme never validates under another.

use crate::canonical::sha256_hex;
use crate::error::{LicenseError, LicenseResult};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the signature scheme of a sealed license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SealScheme {
    #[serde(rename = "sha256-chain")]
    Sha256Chain,
    #[serde(rename = "ed25519")]
    Ed25519,
}

impl SealScheme {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256Chain => "sha256-chain",
            Self::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for SealScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces and checks the signature half of a license seal.
pub trait IntegritySealer: Send + Sync {
    /// The scheme recorded in licenses this sealer signs.
    fn scheme(&self) -> SealScheme;

    /// Signs `message` and returns the hex-encoded signature.
    fn sign(&self, message: &[u8]) -> LicenseResult<String>;

    /// Returns true if `signature` is valid for `message`.
    fn verify(&self, message: &[u8], signature: &str) -> bool;
}

/// Unkeyed digest-chain "signature": `hex(sha256(message))`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DigestChainSealer;

impl IntegritySealer for DigestChainSealer {
    fn scheme(&self) -> SealScheme {
        SealScheme::Sha256Chain
    }

    fn sign(&self, message: &[u8]) -> LicenseResult<String> {
        Ok(sha256_hex(message))
    }

    fn verify(&self, message: &[u8], signature: &str) -> bool {
        sha256_hex(message) == signature
    }
}

/// Generates a random 32-byte Ed25519 seed.
#[must_use]
pub fn generate_seed() -> [u8; 32] {
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);
    seed
}

/// Ed25519 sealer holding the issuer's signing key.
pub struct Ed25519Sealer {
    signing_key: SigningKey,
}

impl Ed25519Sealer {
    /// Creates a sealer from a raw 32-byte secret seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Creates a sealer from a hex-encoded 32-byte seed.
    pub fn from_seed_hex(seed_hex: &str) -> LicenseResult<Self> {
        let bytes = hex::decode(seed_hex.trim())
            .map_err(|e| LicenseError::InvalidInput(format!("invalid seed hex: {e}")))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LicenseError::InvalidInput("seed must be 32 bytes".to_string()))?;
        Ok(Self::from_seed(&seed))
    }

    /// Returns the raw 32-byte public key for distribution to verifiers.
    #[must_use]
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Returns a verify-only counterpart of this sealer.
    #[must_use]
    pub fn verifier(&self) -> Ed25519Verifier {
        Ed25519Verifier {
            verifying_key: self.signing_key.verifying_key(),
        }
    }
}

impl fmt::Debug for Ed25519Sealer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Sealer")
            .field("public_key", &hex::encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

impl IntegritySealer for Ed25519Sealer {
    fn scheme(&self) -> SealScheme {
        SealScheme::Ed25519
    }

    fn sign(&self, message: &[u8]) -> LicenseResult<String> {
        Ok(hex::encode(self.signing_key.sign(message).to_bytes()))
    }

    fn verify(&self, message: &[u8], signature: &str) -> bool {
        verify_ed25519(&self.signing_key.verifying_key(), message, signature)
    }
}

/// Verify-only Ed25519 sealer for parties holding just the public key.
#[derive(Debug, Clone)]
pub struct Ed25519Verifier {
    verifying_key: VerifyingKey,
}

impl Ed25519Verifier {
    /// Creates a verifier from a raw 32-byte public key.
    pub fn from_public_key(bytes: &[u8; 32]) -> LicenseResult<Self> {
        let verifying_key = VerifyingKey::from_bytes(bytes)
            .map_err(|_| LicenseError::InvalidInput("invalid public key".to_string()))?;
        Ok(Self { verifying_key })
    }
}

impl IntegritySealer for Ed25519Verifier {
    fn scheme(&self) -> SealScheme {
        SealScheme::Ed25519
    }

    fn sign(&self, _message: &[u8]) -> LicenseResult<String> {
        Err(LicenseError::SigningUnavailable("ed25519 verifier"))
    }

    fn verify(&self, message: &[u8], signature: &str) -> bool {
        verify_ed25519(&self.verifying_key, message, signature)
    }
}

fn verify_ed25519(key: &VerifyingKey, message: &[u8], signature_hex: &str) -> bool {
    let Ok(bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&bytes) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: [u8; 32] = [7; 32];

    #[test]
    fn digest_chain_roundtrip() {
        let sealer = DigestChainSealer;
        let sig = sealer.sign(b"payload").unwrap();
        assert!(sealer.verify(b"payload", &sig));
        assert!(!sealer.verify(b"payload2", &sig));
    }

    #[test]
    fn ed25519_roundtrip() {
        let sealer = Ed25519Sealer::from_seed(&SEED);
        let sig = sealer.sign(b"payload").unwrap();
        assert!(sealer.verify(b"payload", &sig));
        assert!(sealer.verifier().verify(b"payload", &sig));
        assert!(!sealer.verify(b"tampered", &sig));
    }

    #[test]
    fn ed25519_signature_is_deterministic() {
        let sealer = Ed25519Sealer::from_seed(&SEED);
        assert_eq!(sealer.sign(b"m").unwrap(), sealer.sign(b"m").unwrap());
    }

    #[test]
    fn ed25519_rejects_garbage_signature() {
        let sealer = Ed25519Sealer::from_seed(&SEED);
        assert!(!sealer.verify(b"payload", "not-hex"));
        assert!(!sealer.verify(b"payload", "abcd"));
    }

    #[test]
    fn verifier_cannot_sign() {
        let verifier = Ed25519Sealer::from_seed(&SEED).verifier();
        assert!(matches!(
            verifier.sign(b"x"),
            Err(LicenseError::SigningUnavailable(_))
        ));
    }

    #[test]
    fn seed_hex_must_be_32_bytes() {
        assert!(Ed25519Sealer::from_seed_hex("abcd").is_err());
        assert!(Ed25519Sealer::from_seed_hex(&hex::encode(SEED)).is_ok());
    }

    #[test]
    fn generated_seeds_differ() {
        let a = generate_seed();
        let b = generate_seed();
        assert_ne!(a, b);
        let sealer = Ed25519Sealer::from_seed(&a);
        let sig = sealer.sign(b"m").unwrap();
        assert!(sealer.verifier().verify(b"m", &sig));
    }

    #[test]
    fn wrong_key_fails() {
        let a = Ed25519Sealer::from_seed(&SEED);
        let b = Ed25519Sealer::from_seed(&[9; 32]);
        let sig = a.sign(b"m").unwrap();
        assert!(!b.verify(b"m", &sig));
    }
}
