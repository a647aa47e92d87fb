use chrono::{Duration as ChronoDuration, Utc};
use pretty_assertions::assert_eq;
use rightsguard_compliance::{AccessAttempt, RestrictionEvaluator};
use rightsguard_license::{License, LicenseCodec, Restrictions};
use rightsguard_types::{
    LicenseStatus, ResolutionStatus, Severity, ViolationDraft, ViolationId, ViolationKind,
};
use rightsguard_violations::{
    ComplianceLogEntry, MemoryStore, RecordStore, SqliteStore, StoredViolation,
};
use serde_json::json;

fn license(creator: &str) -> License {
    LicenseCodec::new()
        .generate("do-not-train", creator, creator.as_bytes(), Restrictions::new(), None)
        .unwrap()
}

fn violation(digest: &str, offset_ms: i64) -> StoredViolation {
    let draft = ViolationDraft::new(ViolationKind::UnauthorizedTraining, digest, "github", "GPTBot")
        .with_details(json!({"purpose": "ai-training"}));
    StoredViolation::from_draft(
        draft,
        ViolationId::new(),
        Utc::now() + ChronoDuration::milliseconds(offset_ms),
    )
}

/// Behavior every store must share.
fn exercise(store: &dyn RecordStore) {
    // Licenses
    let a = license("Alice");
    let b = license("Bob");
    store.put_license(&a).unwrap();
    store.put_license(&b).unwrap();
    store.put_license(&a).unwrap();
    assert_eq!(store.licenses().unwrap().len(), 2);
    assert_eq!(store.license(&a.digest).unwrap().unwrap(), a);
    assert!(store.license("missing").unwrap().is_none());

    assert!(store.set_license_status(&a.digest, LicenseStatus::Revoked).unwrap());
    assert!(!store.set_license_status("missing", LicenseStatus::Revoked).unwrap());
    let revoked = store.license(&a.digest).unwrap().unwrap();
    assert_eq!(revoked.status, LicenseStatus::Revoked);
    assert!(LicenseCodec::new().validate(&revoked), "status is outside the seal");

    // Violations
    let v1 = violation(&a.digest, 0);
    let v2 = violation(&a.digest, 5);
    let other = violation(&b.digest, 0);
    assert!(store.insert_violation(&v1).unwrap());
    assert!(!store.insert_violation(&v1).unwrap(), "insert is once per id");
    assert!(store.insert_violation(&v2).unwrap());
    assert!(store.insert_violation(&other).unwrap());

    let loaded = store.violation(v1.id).unwrap().unwrap();
    assert_eq!(loaded.kind, ViolationKind::UnauthorizedTraining);
    assert_eq!(loaded.severity, Severity::High);
    assert_eq!(loaded.details["purpose"], "ai-training");
    assert_eq!(loaded.status, ResolutionStatus::Open);

    let for_a: Vec<ViolationId> = store
        .violations_for(&a.digest)
        .unwrap()
        .iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(for_a, vec![v1.id, v2.id]);

    // Conditional status update
    let now = Utc::now();
    assert!(store
        .update_violation_status(v1.id, ResolutionStatus::Open, ResolutionStatus::Investigating, now)
        .unwrap());
    assert!(!store
        .update_violation_status(v1.id, ResolutionStatus::Open, ResolutionStatus::Resolved, now)
        .unwrap());
    assert!(!store
        .update_violation_status(ViolationId::new(), ResolutionStatus::Open, ResolutionStatus::Resolved, now)
        .unwrap());
    assert_eq!(
        store.violation(v1.id).unwrap().unwrap().status,
        ResolutionStatus::Investigating
    );

    // Compliance log
    let evaluator = RestrictionEvaluator::default();
    for purpose in ["research", "ai-training"] {
        let attempt = AccessAttempt::for_purpose(purpose).on_platform("github");
        let result = evaluator.check(&b, &attempt);
        store
            .append_compliance_log(&ComplianceLogEntry::new(&attempt, &result))
            .unwrap();
    }
    let log = store.compliance_log(&b.digest).unwrap();
    assert_eq!(log.len(), 2);
    assert!(log[0].compliant);
    assert_eq!(log[1].violations, vec!["AI training not permitted".to_string()]);
    assert!(store.compliance_log(&a.digest).unwrap().is_empty());
}

// ── Shared contract ─────────────────────────────────────────────

#[test]
fn memory_store_contract() {
    exercise(&MemoryStore::new());
}

#[test]
fn sqlite_in_memory_contract() {
    exercise(&SqliteStore::open_in_memory().unwrap());
}

// ── SQLite persistence ──────────────────────────────────────────

#[test]
fn sqlite_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");
    let lic = license("Carol");
    let v = violation(&lic.digest, 0);

    {
        let store = SqliteStore::open(&path).unwrap();
        store.put_license(&lic).unwrap();
        store.insert_violation(&v).unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let reloaded = store.license(&lic.digest).unwrap().unwrap();
    assert_eq!(reloaded, lic);
    assert!(LicenseCodec::new().validate(&reloaded));

    let stored = store.violation(v.id).unwrap().unwrap();
    assert_eq!(stored.id, v.id);
    assert_eq!(stored.license_digest, lic.digest);
    assert_eq!(
        stored.detected_at.timestamp_micros(),
        v.detected_at.timestamp_micros()
    );
}

#[test]
fn sqlite_keeps_expiry_and_restrictions() {
    let codec = LicenseCodec::new();
    let lic = codec
        .generate(
            "commercial-restrictions",
            "Dana",
            b"x",
            Restrictions::new()
                .with("commercial_use", false)
                .with("contact", "licensing@example.com"),
            Some(Utc::now() + ChronoDuration::days(30)),
        )
        .unwrap();

    let store = SqliteStore::open_in_memory().unwrap();
    store.put_license(&lic).unwrap();
    let reloaded = store.license(&lic.digest).unwrap().unwrap();
    assert_eq!(reloaded.expires_at, lic.expires_at);
    assert_eq!(reloaded.restrictions, lic.restrictions);
    assert!(codec.validate(&reloaded));
}

#[test]
fn other_violation_kinds_round_trip_through_sqlite() {
    let store = SqliteStore::open_in_memory().unwrap();
    let draft = ViolationDraft::new(
        ViolationKind::Other("deepfake_detected".into()),
        "digest",
        "youtube",
        "detector",
    )
    .with_severity(Severity::Critical);
    let v = StoredViolation::from_draft(draft, ViolationId::new(), Utc::now());
    store.insert_violation(&v).unwrap();

    let loaded = store.violation(v.id).unwrap().unwrap();
    assert_eq!(loaded.kind, ViolationKind::Other("deepfake_detected".into()));
    assert_eq!(loaded.severity, Severity::Critical);
}
