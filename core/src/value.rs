//! Dynamic value tree inspected by checks and shaped by the serializer.
//!
//! Request fields arrive as loosely typed JSON, query strings and headers.
//! [`Value`] is the closed set of shapes those inputs can take once parsed,
//! plus two shapes JSON cannot express directly:
//!
//! - [`Value::Undefined`]: the field is not there at all (as opposed to an
//!   explicit `null`)
//! - [`Value::Date`]: a point in time produced by a date cast
//!
//! # Example
//!
//! ```
//! use restguard_core::Value;
//!
//! let value = Value::from(serde_json::json!({ "user_name": "alice", "age": 42 }));
//! assert_eq!(value.get("age"), Some(&Value::Number(42.0)));
//! assert!(value.get("missing").is_none());
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered key/value mapping used by [`Value::Object`].
pub type Map = BTreeMap<String, Value>;

/// A dynamically typed request or response value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value at all. Object entries holding it are dropped on output.
    #[default]
    Undefined,
    /// Explicit `null`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Any number. Integers are numbers without a fractional part.
    Number(f64),
    /// UTF-8 string.
    String(String),
    /// UTC timestamp.
    Date(DateTime<Utc>),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Keyed mapping.
    Object(Map),
}

impl Value {
    /// Returns `true` for `Undefined` and `Null`.
    #[must_use]
    pub const fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Returns `true` if the value counts as "not provided": nullish or `""`.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => true,
            Self::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Borrow the string content, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The number, if this is a number.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Look up a key of an object. Non-objects have no keys.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Short name of the variant, used in log lines.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Convert any serializable type through its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `T` cannot be represented as JSON
    /// (for example a map with non-string keys).
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }

    /// Render as JSON. `Undefined` becomes `null`, except inside objects
    /// where the entry is skipped.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Undefined | Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Date(d) => serde_json::Value::String(format_date(d)),
            Self::Array(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(map) => serde_json::Value::Object(
                map.iter()
                    .filter(|(_, v)| !matches!(v, Self::Undefined))
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// ISO-8601 rendering used for every date leaving the crate.
#[must_use]
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// Integral values print without a fraction, matching how clients sent them.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn number_to_json(n: f64) -> serde_json::Value {
    const SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= SAFE_INTEGER {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Undefined | Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => number_to_json(*n).serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Date(d) => serializer.serialize_str(&format_date(d)),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            },
            Self::Object(map) => {
                let present = map.iter().filter(|(_, v)| !matches!(v, Self::Undefined));
                let mut out = serializer.serialize_map(None)?;
                for (key, value) in present {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            },
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            },
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        value.to_json()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

#[allow(clippy::cast_precision_loss)]
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

#[allow(clippy::cast_precision_loss)]
impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Object(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Undefined, Into::into)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nullish_and_kind_names() {
        assert!(Value::Undefined.is_nullish());
        assert!(Value::Null.is_nullish());
        assert!(!Value::from("").is_nullish());
        assert!(Value::from("").is_missing());
        assert_eq!(Value::from(json!([1])).kind_name(), "array");
        assert_eq!(Value::from(json!({})).kind_name(), "object");
        assert_eq!(Value::from(3).kind_name(), "number");
    }

    #[test]
    fn test_from_json_round_trips_scalars() {
        let value = Value::from(json!({"a": 1, "b": [true, null], "c": "x"}));
        assert_eq!(value.to_json(), json!({"a": 1, "b": [true, null], "c": "x"}));
    }

    #[test]
    fn test_undefined_entries_are_skipped_in_json() {
        let mut map = Map::new();
        map.insert("kept".into(), Value::Null);
        map.insert("dropped".into(), Value::Undefined);
        assert_eq!(Value::Object(map).to_json(), json!({"kept": null}));
    }

    #[test]
    fn test_date_renders_iso_with_millis() {
        let date = DateTime::parse_from_rfc3339("2017-10-08T01:23:45Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(Value::Date(date).to_json(), json!("2017-10-08T01:23:45.000Z"));
    }

    #[test]
    fn test_serialize_impl_matches_to_json() {
        let value = Value::from(json!({"n": 1.5, "s": "x"}));
        let direct = serde_json::to_value(&value).unwrap();
        assert_eq!(direct, value.to_json());
    }

    #[test]
    fn test_is_missing() {
        assert!(Value::Undefined.is_missing());
        assert!(Value::Null.is_missing());
        assert!(Value::from("").is_missing());
        assert!(!Value::from(" ").is_missing());
        assert!(!Value::from(0).is_missing());
    }
}
