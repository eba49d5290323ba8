//! Response shaping.
//!
//! [`serialize`] normalizes a value tree before it goes on the wire:
//!
//! - dates become ISO-8601 strings
//! - object keys are renamed from wire case to `camelCase`
//! - object entries whose value is [`Value::Undefined`] are dropped
//! - keys that collide after renaming (`user_name` and `userName`) keep the
//!   entry whose original key sorts last
//! - arrays keep their order and length
//! - scalars pass through untouched
//!
//! The transform is pure and idempotent: serializing an already serialized
//! tree changes nothing.

use crate::casing::to_camel_case;
use crate::value::{Map, Value, format_date};

/// Normalize `value` for output. See the module docs.
#[must_use]
pub fn serialize(value: &Value) -> Value {
    match value {
        Value::Date(date) => Value::String(format_date(date)),
        Value::Array(items) => Value::Array(items.iter().map(serialize).collect()),
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, v) in map.iter().filter(|(_, v)| !matches!(v, Value::Undefined)) {
                let renamed = to_camel_case(key);
                if out.insert(renamed, serialize(v)).is_some() {
                    tracing::debug!(key = %key, "key collides with another after camel-casing, keeping the later one");
                }
            }
            Value::Object(out)
        }
        Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.clone(),
    }
}

/// Serialize straight to JSON.
#[must_use]
pub fn to_json(value: &Value) -> serde_json::Value {
    serialize(value).to_json()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_dates_become_iso_strings() {
        let date = DateTime::parse_from_rfc3339("2024-02-29T12:00:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(serialize(&Value::Date(date)), Value::from("2024-02-29T12:00:00.000Z"));
    }

    #[test]
    fn test_colliding_keys_keep_the_last_original_key() {
        let input = Value::from(json!({ "userName": "camel", "user_name": "snake" }));
        assert_eq!(to_json(&input), json!({ "userName": "snake" }));

        let input = Value::from(json!({ "user-name": "kebab", "userName": "camel" }));
        assert_eq!(to_json(&input), json!({ "userName": "camel" }));
    }

    #[test]
    fn test_keys_are_camel_cased_recursively() {
        let input = Value::from(json!({
            "user_name": "alice",
            "home-address": { "zip_code": "12345" },
            "tags": [{ "tag_id": 1 }]
        }));
        assert_eq!(
            to_json(&input),
            json!({
                "userName": "alice",
                "homeAddress": { "zipCode": "12345" },
                "tags": [{ "tagId": 1 }]
            })
        );
    }

    #[test]
    fn test_undefined_entries_are_dropped_but_null_kept() {
        let mut map = Map::new();
        map.insert("gone".into(), Value::Undefined);
        map.insert("kept_null".into(), Value::Null);
        let Value::Object(out) = serialize(&Value::Object(map)) else {
            unreachable!("objects serialize to objects");
        };
        assert!(!out.contains_key("gone"));
        assert_eq!(out.get("keptNull"), Some(&Value::Null));
    }

    #[test]
    fn test_scalars_and_arrays_are_unchanged() {
        assert_eq!(serialize(&Value::from(1.5)), Value::from(1.5));
        assert_eq!(serialize(&Value::Null), Value::Null);
        assert_eq!(serialize(&Value::Undefined), Value::Undefined);
        let list = Value::from(json!([3, "b", true]));
        assert_eq!(serialize(&list), list);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let input = Value::from(json!({"snake_key": 1}));
        let copy = input.clone();
        let _ = serialize(&input);
        assert_eq!(input, copy);
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            Just(Value::Undefined),
            any::<bool>().prop_map(Value::Bool),
            (-1.0e9..1.0e9f64).prop_map(Value::Number),
            "[a-z ]{0,8}".prop_map(Value::String),
            (0i64..4_000_000_000).prop_map(|s| Value::Date(DateTime::from_timestamp(s, 0).unwrap_or_default())),
        ];
        leaf.prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z_-]{1,8}", inner, 0..4).prop_map(Value::Object),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_serialize_is_idempotent(value in arb_value()) {
            let once = serialize(&value);
            prop_assert_eq!(serialize(&once), once);
        }

        #[test]
        fn prop_serialized_objects_hold_no_undefined(value in arb_value()) {
            fn clean(v: &Value) -> bool {
                match v {
                    Value::Object(map) => map.values().all(|v| !matches!(v, Value::Undefined) && clean(v)),
                    Value::Array(items) => items.iter().all(clean),
                    Value::Date(_) => false,
                    _ => true,
                }
            }
            prop_assert!(clean(&serialize(&value)));
        }
    }
}
