use rightsguard_types::{DeploymentId, LicenseId, ViolationId};
use std::collections::HashSet;
use std::str::FromStr;

// ── LicenseId ─────────────────────────────────────────────────────

#[test]
fn license_id_new_is_unique() {
    let a = LicenseId::new();
    let b = LicenseId::new();
    assert_ne!(a, b);
}

#[test]
fn license_id_display_and_parse() {
    let id = LicenseId::new();
    let parsed = LicenseId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn license_id_from_str_invalid() {
    assert!(LicenseId::from_str("garbage").is_err());
}

#[test]
fn license_id_is_time_ordered() {
    let first = LicenseId::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = LicenseId::new();
    assert!(first < second);
    assert!(first.timestamp_millis().unwrap() <= second.timestamp_millis().unwrap());
}

#[test]
fn license_id_embeds_creation_time() {
    let before = chrono::Utc::now().timestamp_millis() as u64;
    let id = LicenseId::new();
    let after = chrono::Utc::now().timestamp_millis() as u64;
    let ts = id.timestamp_millis().unwrap();
    assert!(ts >= before && ts <= after);
}

#[test]
fn license_id_serde_is_transparent() {
    let id = LicenseId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
    let back: LicenseId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

// ── ViolationId / DeploymentId ────────────────────────────────────

#[test]
fn violation_id_hash_and_eq() {
    let id = ViolationId::new();
    let mut set = HashSet::new();
    set.insert(id);
    set.insert(id);
    assert_eq!(set.len(), 1);
}

#[test]
fn deployment_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = DeploymentId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn v4_uuid_has_no_timestamp() {
    let id = ViolationId::from_uuid(uuid::Uuid::new_v4());
    assert!(id.timestamp_millis().is_none());
}
