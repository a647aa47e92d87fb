use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rightsguard_license::{
    content_digest, Ed25519Sealer, License, LicenseCodec, LicenseError, RestrictionValue,
    Restrictions, SealScheme, SCHEMA_VERSION,
};
use rightsguard_types::{LicenseStatus, LicenseType};
use serde_json::json;
use std::sync::Arc;

fn sample(codec: &LicenseCodec) -> License {
    codec
        .generate(
            "do-not-train",
            "Jane",
            b"abc",
            Restrictions::new().with("ai_training", false),
            None,
        )
        .unwrap()
}

// ── Generation ───────────────────────────────────────────────────

#[test]
fn generate_populates_every_field() {
    let codec = LicenseCodec::new();
    let license = sample(&codec);

    assert_eq!(license.license_type, LicenseType::DoNotTrain);
    assert_eq!(license.creator, "Jane");
    assert_eq!(license.content_digest, content_digest(b"abc"));
    assert_eq!(
        license.restrictions.get("ai_training"),
        Some(&RestrictionValue::Flag(false))
    );
    assert_eq!(license.schema_version, SCHEMA_VERSION);
    assert_eq!(license.seal_scheme, SealScheme::Sha256Chain);
    assert_eq!(license.status, LicenseStatus::Active);
    assert_eq!(license.digest.len(), 64);
    assert_eq!(license.signature.len(), 64);
    assert_ne!(license.digest, license.signature);
}

#[test]
fn content_is_never_stored() {
    let codec = LicenseCodec::new();
    let license = codec
        .generate("nda-enforcement", "Jane", b"top secret draft", Restrictions::new(), None)
        .unwrap();
    let json = serde_json::to_string(&license).unwrap();
    assert!(!json.contains("top secret draft"));
}

#[test]
fn generate_rejects_unknown_type() {
    let codec = LicenseCodec::new();
    let err = codec
        .generate("public-domain", "Jane", b"abc", Restrictions::new(), None)
        .unwrap_err();
    assert!(matches!(err, LicenseError::UnsupportedType(ref t) if t == "public-domain"));
}

#[test]
fn generate_rejects_empty_creator() {
    let codec = LicenseCodec::new();
    let err = codec
        .generate("do-not-train", "  ", b"abc", Restrictions::new(), None)
        .unwrap_err();
    assert!(matches!(err, LicenseError::InvalidInput(_)));
}

#[test]
fn generate_rejects_control_characters_in_creator() {
    let codec = LicenseCodec::new();
    let err = codec
        .generate(
            "do-not-train",
            "Jane\nUser-agent: GPTBot\nAllow: /",
            b"abc",
            Restrictions::new(),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, LicenseError::InvalidInput(ref msg) if msg.contains("control")));
}

#[test]
fn generate_rejects_expiry_before_creation() {
    let codec = LicenseCodec::new();
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let err = codec
        .generate_at(
            "do-not-train",
            "Jane",
            b"abc",
            Restrictions::new(),
            Some(now - Duration::days(1)),
            now,
        )
        .unwrap_err();
    assert!(matches!(err, LicenseError::InvalidInput(_)));
}

#[test]
fn identifiers_are_unique_per_generation() {
    let codec = LicenseCodec::new();
    let a = sample(&codec);
    let b = sample(&codec);
    assert_ne!(a.id, b.id);
    assert_ne!(a.digest, b.digest);
}

// ── Validation ───────────────────────────────────────────────────

#[test]
fn validate_after_generate_is_true() {
    let codec = LicenseCodec::new();
    for t in LicenseType::ALL {
        let license = codec
            .generate(t.as_str(), "Jane", b"content", Restrictions::new(), None)
            .unwrap();
        assert!(codec.validate(&license), "{t} failed to validate");
    }
}

#[test]
fn validate_detects_field_tampering() {
    let codec = LicenseCodec::new();
    let original = sample(&codec);

    let mut l = original.clone();
    l.creator = "Mallory".into();
    assert!(!codec.validate(&l));

    let mut l = original.clone();
    l.license_type = LicenseType::AttributionRequired;
    assert!(!codec.validate(&l));

    let mut l = original.clone();
    l.restrictions = Restrictions::new().with("ai_training", true);
    assert!(!codec.validate(&l));

    let mut l = original.clone();
    l.expires_at = Some(Utc::now() + Duration::days(30));
    assert!(!codec.validate(&l));

    let mut l = original.clone();
    l.schema_version = "2.0".into();
    assert!(!codec.validate(&l));

    let mut l = original.clone();
    l.created_at = l.created_at + Duration::milliseconds(1);
    assert!(!codec.validate(&l));
}

#[test]
fn validate_detects_seal_tampering() {
    let codec = LicenseCodec::new();
    let original = sample(&codec);

    let mut l = original.clone();
    l.digest = "0".repeat(64);
    assert!(!codec.validate(&l));

    let mut l = original.clone();
    l.signature = "0".repeat(64);
    assert!(!codec.validate(&l));

    let mut l = original;
    l.signature.clear();
    assert!(!codec.validate(&l));
}

#[test]
fn status_change_keeps_seal_valid() {
    let codec = LicenseCodec::new();
    let mut license = sample(&codec);
    license.status = LicenseStatus::Revoked;
    assert!(codec.validate(&license));
}

#[test]
fn validate_json_handles_malformed_records() {
    let codec = LicenseCodec::new();
    let license = sample(&codec);

    let good = serde_json::to_value(&license).unwrap();
    assert!(codec.validate_json(&good));

    let mut missing = good.clone();
    missing.as_object_mut().unwrap().remove("creator");
    assert!(!codec.validate_json(&missing));

    assert!(!codec.validate_json(&json!("not a license")));
    assert!(!codec.validate_json(&json!({"type": "nope"})));
}

#[test]
fn serde_roundtrip_keeps_validity() {
    let codec = LicenseCodec::new();
    let license = codec
        .generate(
            "attribution-required",
            "Jane",
            b"abc",
            Restrictions::new().with("credit_line", "Photo: Jane"),
            Some(Utc::now() + Duration::days(365)),
        )
        .unwrap();
    let json = serde_json::to_string(&license).unwrap();
    let back: License = serde_json::from_str(&json).unwrap();
    assert_eq!(back, license);
    assert!(codec.validate(&back));
}

// ── Determinism ──────────────────────────────────────────────────

#[test]
fn digest_independent_of_restriction_insertion_order() {
    let codec = LicenseCodec::new();
    let license = codec
        .generate(
            "commercial-restrictions",
            "Jane",
            b"abc",
            Restrictions::from_json(&json!({"a": true, "b": "x", "c": false})).unwrap(),
            None,
        )
        .unwrap();

    let mut reordered = license.clone();
    reordered.restrictions =
        vec![("c", RestrictionValue::Flag(false)), ("b", "x".into()), ("a", true.into())]
            .into_iter()
            .collect();

    assert_eq!(LicenseCodec::digest_of(&reordered).unwrap(), license.digest);
    assert!(codec.validate(&reordered));
}

#[test]
fn digest_is_stable_across_runs() {
    let codec = LicenseCodec::new();
    let license = sample(&codec);
    for _ in 0..10 {
        assert_eq!(LicenseCodec::digest_of(&license).unwrap(), license.digest);
    }
}

// ── Lifecycle ────────────────────────────────────────────────────

#[test]
fn effective_status_expires_by_time() {
    let codec = LicenseCodec::new();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let license = codec
        .generate_at(
            "pre-clearance",
            "Jane",
            b"abc",
            Restrictions::new(),
            Some(now + Duration::days(1)),
            now,
        )
        .unwrap();

    assert_eq!(license.effective_status(now), LicenseStatus::Active);
    assert_eq!(
        license.effective_status(now + Duration::days(2)),
        LicenseStatus::Expired
    );

    let mut revoked = license.clone();
    revoked.status = LicenseStatus::Revoked;
    assert_eq!(
        revoked.effective_status(now + Duration::days(2)),
        LicenseStatus::Revoked
    );
}

// ── Ed25519 sealing ──────────────────────────────────────────────

#[test]
fn ed25519_sealed_license_validates_with_public_key() {
    let sealer = Ed25519Sealer::from_seed(&[42; 32]);
    let verifier = Arc::new(sealer.verifier());
    let issuer = LicenseCodec::with_sealer(Arc::new(sealer));
    let license = sample(&issuer);

    assert_eq!(license.seal_scheme, SealScheme::Ed25519);
    assert_eq!(license.signature.len(), 128);
    assert!(issuer.validate(&license));
    assert!(LicenseCodec::with_sealer(verifier).validate(&license));
}

#[test]
fn schemes_do_not_cross_validate() {
    let chain = LicenseCodec::new();
    let ed = LicenseCodec::with_sealer(Arc::new(Ed25519Sealer::from_seed(&[1; 32])));

    assert!(!ed.validate(&sample(&chain)));
    assert!(!chain.validate(&sample(&ed)));
}

#[test]
fn verify_only_codec_cannot_generate() {
    let verifier = Ed25519Sealer::from_seed(&[3; 32]).verifier();
    let codec = LicenseCodec::with_sealer(Arc::new(verifier));
    let err = codec
        .generate("do-not-train", "Jane", b"abc", Restrictions::new(), None)
        .unwrap_err();
    assert!(matches!(err, LicenseError::SigningUnavailable(_)));
}
