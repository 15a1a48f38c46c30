// SPDX-License-Identifier: Apache-2.0

use commtest_core::canonical::{document_bytes, ContentDigest};
use proptest::prelude::*;
use serde_json::json;

#[test]
fn digest_serializes_as_bare_hex() {
    let digest = ContentDigest::of(&json!({"name": "Insulation Resistance"})).expect("digest");
    let encoded = serde_json::to_value(&digest).expect("encode");
    assert_eq!(encoded, json!(digest.as_str()));
    assert_eq!(digest.to_string().len(), 64);
}

#[test]
fn digest_changes_with_content() {
    let a = ContentDigest::of(&json!({"expected_min": 1})).expect("a");
    let b = ContentDigest::of(&json!({"expected_min": 2})).expect("b");
    assert_ne!(a, b);
}

proptest! {
    #[test]
    fn documents_are_independent_of_object_key_order(
        a in "[a-z_]{1,16}",
        b in "[a-z_]{1,16}",
        av in any::<u32>(),
        bv in any::<u32>(),
    ) {
        prop_assume!(a != b);

        let left = json!({"cell": {a.clone(): av, b.clone(): bv}});
        let right = json!({"cell": {b: bv, a: av}});

        prop_assert_eq!(
            document_bytes(&left).expect("left"),
            document_bytes(&right).expect("right")
        );
        prop_assert_eq!(
            ContentDigest::of(&left).expect("left digest"),
            ContentDigest::of(&right).expect("right digest")
        );
    }
}
