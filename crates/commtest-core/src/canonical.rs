//! Canonical JSON documents: the byte form shared by CLI output and the
//! local store, and the digest used to fingerprint test drafts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Compact JSON with object keys in byte order at every depth. Arrays keep
/// their order.
pub fn document_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&sorted(serde_json::to_value(value)?))
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sorted(v))).collect();
            Value::Object(ordered.into_iter().collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        scalar => scalar,
    }
}

/// Lowercase hex sha256 of a canonical document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    /// Digest of `value`'s [`document_bytes`]; equal for values that differ
    /// only in object key order.
    pub fn of<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        document_bytes(value).map(|bytes| Self::of_bytes(&bytes))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_are_sorted_and_arrays_kept() {
        let doc = json!({
            "status": "draft",
            "responses": [{"value": 0.5, "input_id": "ir-1"}, {"value": true, "input_id": "a"}],
        });
        let text = String::from_utf8(document_bytes(&doc).expect("bytes")).expect("utf8");
        assert_eq!(
            text,
            r#"{"responses":[{"input_id":"ir-1","value":0.5},{"input_id":"a","value":true}],"status":"draft"}"#
        );
    }

    #[test]
    fn digest_is_sha256_hex() {
        assert_eq!(
            ContentDigest::of_bytes(b"abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
