//! Canonical JSON and the integrity hash computed over it

use crate::error::FixtureResult;
use serde::Serialize;
use serde_json::{Map, Value};
use tessera_crypto::sha256;

/// Rebuild every object with its keys in sorted order. Key order must not
/// depend on which map backs `serde_json::Value` in the final build.
pub(crate) fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Canonical value: sorted keys at every level
pub fn canonical_value<T: Serialize + ?Sized>(body: &T) -> FixtureResult<Value> {
    Ok(sort_keys(serde_json::to_value(body)?))
}

/// Compact, key-sorted encoding of `body`
pub fn canonical_json<T: Serialize + ?Sized>(body: &T) -> FixtureResult<Vec<u8>> {
    Ok(serde_json::to_vec(&canonical_value(body)?)?)
}

/// `0x`-prefixed sha-256 of [`canonical_json`]
pub fn integrity_hash<T: Serialize + ?Sized>(body: &T) -> FixtureResult<String> {
    Ok(sha256(&canonical_json(body)?).to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Unordered {
        zeta: u8,
        alpha: Vec<Inner>,
    }

    #[derive(Serialize)]
    struct Inner {
        y: u8,
        x: u8,
    }

    #[test]
    fn test_keys_sorted_at_every_level() {
        let body = Unordered {
            zeta: 1,
            alpha: vec![Inner { y: 2, x: 3 }],
        };
        let out = String::from_utf8(canonical_json(&body).unwrap()).unwrap();
        assert_eq!(out, r#"{"alpha":[{"x":3,"y":2}],"zeta":1}"#);
    }

    #[test]
    fn test_hash_ignores_construction_order() {
        let a = json!({"b": 1, "a": {"d": [1, 2], "c": "0x00"}});
        let b = json!({"a": {"c": "0x00", "d": [1, 2]}, "b": 1});
        assert_eq!(integrity_hash(&a).unwrap(), integrity_hash(&b).unwrap());
    }

    #[test]
    fn test_hash_format() {
        let hash = integrity_hash(&json!({})).unwrap();
        // sha256("{}")
        assert_eq!(
            hash,
            "0x44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_array_order_is_significant() {
        assert_ne!(
            integrity_hash(&json!([1, 2])).unwrap(),
            integrity_hash(&json!([2, 1])).unwrap()
        );
    }

    fn object(entries: &[(String, u32)]) -> Value {
        let mut map = Map::new();
        for (k, v) in entries {
            map.insert(k.clone(), json!(v));
        }
        json!({ "post": map, "network": "Cancun" })
    }

    proptest! {
        #[test]
        fn prop_insertion_order_never_changes_the_hash(
            entries in proptest::collection::btree_map("[a-z]{1,6}", any::<u32>(), 0..16)
        ) {
            let forward: Vec<(String, u32)> = entries.into_iter().collect();
            let mut backward = forward.clone();
            backward.reverse();
            let a = object(&forward);
            let b = object(&backward);
            prop_assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
            prop_assert_eq!(integrity_hash(&a).unwrap(), integrity_hash(&b).unwrap());
        }

        #[test]
        fn prop_canonical_form_is_a_fixed_point(
            entries in proptest::collection::btree_map("[a-z]{1,6}", any::<u32>(), 0..16)
        ) {
            let forward: Vec<(String, u32)> = entries.into_iter().collect();
            let once = canonical_json(&object(&forward)).unwrap();
            let reparsed: Value = serde_json::from_slice(&once).unwrap();
            prop_assert_eq!(canonical_json(&reparsed).unwrap(), once);
        }
    }
}
