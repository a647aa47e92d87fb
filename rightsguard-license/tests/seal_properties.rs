//! Property-based tests for license sealing.
//!
//! These verify properties that must hold for every license:
//! - A freshly generated license validates
//! - The digest does not depend on restriction insertion order
//! - Changing any single byte of a sealed field breaks validation

use proptest::prelude::*;
use rightsguard_license::{License, LicenseCodec, RestrictionValue, Restrictions};
use rightsguard_types::LicenseType;

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn license_type_strategy() -> impl Strategy<Value = LicenseType> {
    prop::sample::select(LicenseType::ALL.to_vec())
}

fn creator_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z .'-]{0,40}").unwrap()
}

fn restriction_strategy() -> impl Strategy<Value = Vec<(String, RestrictionValue)>> {
    let value = prop_oneof![
        any::<bool>().prop_map(RestrictionValue::Flag),
        "[a-z0-9 ]{0,20}".prop_map(RestrictionValue::Text),
    ];
    prop::collection::btree_map("[a-z_]{1,12}", value, 0..6)
        .prop_map(|m| m.into_iter().collect())
}

fn generate(
    t: LicenseType,
    creator: &str,
    content: &[u8],
    restrictions: Vec<(String, RestrictionValue)>,
) -> (LicenseCodec, License) {
    let codec = LicenseCodec::new();
    let license = codec
        .generate(
            t.as_str(),
            creator,
            content,
            restrictions.into_iter().collect(),
            None,
        )
        .unwrap();
    (codec, license)
}

/// Replaces the byte at `idx % len` with a different printable ASCII byte.
fn mutate_ascii(s: &str, idx: usize, delta: u8) -> String {
    let mut bytes = s.as_bytes().to_vec();
    let i = idx % bytes.len();
    let original = bytes[i];
    let mut replacement = b' ' + ((original - b' ' + 1 + delta % 94) % 95);
    if replacement == original {
        replacement = if original == b'a' { b'b' } else { b'a' };
    }
    bytes[i] = replacement;
    String::from_utf8(bytes).unwrap()
}

// =============================================================================
// SEAL PROPERTIES
// =============================================================================

proptest! {
    /// Every generated license validates immediately.
    #[test]
    fn generated_license_validates(
        t in license_type_strategy(),
        creator in creator_strategy(),
        content in prop::collection::vec(any::<u8>(), 0..512),
        restrictions in restriction_strategy(),
    ) {
        let (codec, license) = generate(t, &creator, &content, restrictions);
        prop_assert!(codec.validate(&license));
    }

    /// Restriction insertion order never changes the digest.
    #[test]
    fn digest_independent_of_insertion_order(
        restrictions in restriction_strategy(),
        creator in creator_strategy(),
    ) {
        let (_, license) = generate(LicenseType::DoNotTrain, &creator, b"abc", restrictions.clone());

        let mut reversed = license.clone();
        reversed.restrictions = restrictions.into_iter().rev().collect::<Restrictions>();
        prop_assert_eq!(LicenseCodec::digest_of(&reversed).unwrap(), license.digest);
    }

    /// A single-byte change to the creator breaks validation.
    #[test]
    fn creator_mutation_detected(
        creator in creator_strategy(),
        idx in any::<usize>(),
        delta in any::<u8>(),
    ) {
        let (codec, mut license) = generate(LicenseType::PreClearance, &creator, b"x", vec![]);
        license.creator = mutate_ascii(&license.creator, idx, delta);
        prop_assert!(!codec.validate(&license));
    }

    /// A single-byte change to the content digest breaks validation.
    #[test]
    fn content_digest_mutation_detected(idx in any::<usize>(), delta in any::<u8>()) {
        let (codec, mut license) = generate(LicenseType::NdaEnforcement, "Jane", b"abc", vec![]);
        license.content_digest = mutate_ascii(&license.content_digest, idx, delta);
        prop_assert!(!codec.validate(&license));
    }

    /// A single-byte change to the identifier breaks validation.
    #[test]
    fn id_mutation_detected(idx in any::<usize>()) {
        let (codec, mut license) = generate(LicenseType::DoNotTrain, "Jane", b"abc", vec![]);
        let id = license.id.to_string();
        // Only hex digits keep the UUID parseable; flip one to another hex digit.
        let positions: Vec<usize> = id.char_indices().filter(|(_, c)| *c != '-').map(|(i, _)| i).collect();
        let pos = positions[idx % positions.len()];
        let mut bytes = id.into_bytes();
        bytes[pos] = if bytes[pos] == b'0' { b'1' } else { b'0' };
        license.id = rightsguard_types::LicenseId::parse(std::str::from_utf8(&bytes).unwrap()).unwrap();
        prop_assert!(!codec.validate(&license));
    }

    /// A single-byte change to a text restriction breaks validation.
    #[test]
    fn restriction_text_mutation_detected(
        text in "[a-z]{1,20}",
        idx in any::<usize>(),
        delta in any::<u8>(),
    ) {
        let (codec, mut license) = generate(
            LicenseType::AttributionRequired,
            "Jane",
            b"abc",
            vec![("credit".to_string(), RestrictionValue::Text(text.clone()))],
        );
        license.restrictions = Restrictions::new().with("credit", mutate_ascii(&text, idx, delta));
        prop_assert!(!codec.validate(&license));
    }

    /// A single-byte change to the stored digest or signature breaks validation.
    #[test]
    fn seal_mutation_detected(idx in any::<usize>(), delta in any::<u8>(), which in any::<bool>()) {
        let (codec, mut license) = generate(LicenseType::CommercialRestrictions, "Jane", b"abc", vec![]);
        if which {
            license.digest = mutate_ascii(&license.digest, idx, delta);
        } else {
            license.signature = mutate_ascii(&license.signature, idx, delta);
        }
        prop_assert!(!codec.validate(&license));
    }
}
