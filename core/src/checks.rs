//! Validation and coercion primitives.
//!
//! Every function here is pure: it takes a [`Value`], either hands back the
//! (possibly coerced) value or rejects it with a [`ValidationError`]. Nothing
//! is silently swallowed. Because each check returns the value it was given,
//! checks chain naturally:
//!
//! ```
//! use restguard_core::checks::{self, CastTarget};
//! use restguard_core::Value;
//!
//! let page = checks::cast(CastTarget::Integer, Value::from("12.7"))
//!     .and_then(|v| checks::check(v, |v| Ok(v)));
//! assert_eq!(page, Ok(Value::Number(12.0)));
//! ```
//!
//! Higher-level code usually builds a [`Rules`](crate::rules::Rules) chain
//! instead of calling these one by one.

use crate::error::{ErrorKind, Result, ValidationError};
use crate::value::{Value, format_date};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Types a value can be coerced into with [`cast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastTarget {
    /// Text.
    String,
    /// Finite number.
    Number,
    /// Finite number, rounded down.
    Integer,
    /// Truthiness.
    Boolean,
    /// Point in time.
    Date,
}

impl CastTarget {
    /// The type a successful cast is guaranteed to satisfy.
    #[must_use]
    pub const fn type_name(self) -> TypeName {
        match self {
            Self::String => TypeName::String,
            Self::Number => TypeName::Number,
            Self::Integer => TypeName::Integer,
            Self::Boolean => TypeName::Boolean,
            Self::Date => TypeName::Date,
        }
    }
}

/// Types a value can be strictly checked against with [`expect_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeName {
    /// Text.
    String,
    /// Finite number.
    Number,
    /// Finite whole number.
    Integer,
    /// `true` / `false`.
    Boolean,
    /// Sequence.
    Array,
    /// Keyed mapping. Arrays and dates are not objects.
    Object,
    /// Point in time.
    Date,
}

impl TypeName {
    /// Lower-case name, as used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Date => "date",
        }
    }

    const fn mismatch(self) -> ErrorKind {
        match self {
            Self::String => ErrorKind::NoString,
            Self::Number => ErrorKind::NoNumber,
            Self::Integer => ErrorKind::NoInteger,
            Self::Boolean => ErrorKind::NoBoolean,
            Self::Array => ErrorKind::NoArray,
            Self::Object => ErrorKind::NoObject,
            Self::Date => ErrorKind::NoDate,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown type name in configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown type name: {0}")]
pub struct UnknownType(pub String);

impl FromStr for TypeName {
    type Err = UnknownType;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "integer" => Ok(Self::Integer),
            "boolean" => Ok(Self::Boolean),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            "date" => Ok(Self::Date),
            other => Err(UnknownType(other.to_owned())),
        }
    }
}

impl FromStr for CastTarget {
    type Err = UnknownType;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "integer" => Ok(Self::Integer),
            "boolean" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            other => Err(UnknownType(other.to_owned())),
        }
    }
}

fn reject<T>(kind: ErrorKind) -> Result<T> {
    Err(ValidationError::new(kind))
}

/// Presence check.
///
/// Returns `Ok(Some(value))` when the value is present, `Ok(None)` when it is
/// missing but optional (callers skip any further checks), and `MISSING`
/// when it is missing and required. `null`, undefined and `""` count as
/// missing.
///
/// # Errors
///
/// `MISSING` if the value is missing and not optional.
pub fn optional(is_optional: bool, value: Value) -> Result<Option<Value>> {
    if !value.is_missing() {
        return Ok(Some(value));
    }
    if is_optional { Ok(None) } else { reject(ErrorKind::Missing) }
}

/// Coerce a value into `target`.
///
/// Missing values become the type's zero value (`""`, `0`, `false`, now).
/// Numeric strings are parsed; non-finite results are rejected. Booleans are
/// truthiness (`0` and `""` are false). Dates accept epoch seconds or
/// ISO-8601 strings. `Integer` is a number cast followed by `floor`.
///
/// # Errors
///
/// `INVALID` if the source shape cannot be coerced or parses to something
/// unusable.
pub fn cast(target: CastTarget, value: Value) -> Result<Value> {
    match target {
        CastTarget::String => cast_string(value),
        CastTarget::Number => cast_number(value).map(Value::Number),
        CastTarget::Integer => cast_number(value).map(|n| Value::Number(n.floor())),
        CastTarget::Boolean => cast_boolean(value),
        CastTarget::Date => cast_date(value),
    }
}

fn cast_string(value: Value) -> Result<Value> {
    match value {
        Value::Undefined | Value::Null => Ok(Value::String(String::new())),
        Value::String(_) => Ok(value),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        Value::Date(d) => Ok(Value::String(format_date(&d))),
        Value::Array(_) | Value::Object(_) => reject(ErrorKind::Invalid),
    }
}

fn cast_number(value: Value) -> Result<f64> {
    let n = match value {
        Value::Undefined | Value::Null => 0.0,
        Value::Number(n) => n,
        Value::Bool(b) => f64::from(u8::from(b)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().map_err(|_| ValidationError::new(ErrorKind::Invalid))?
            }
        },
        Value::Date(_) | Value::Array(_) | Value::Object(_) => return reject(ErrorKind::Invalid),
    };
    if n.is_finite() { Ok(n) } else { reject(ErrorKind::Invalid) }
}

fn cast_boolean(value: Value) -> Result<Value> {
    match value {
        Value::Undefined | Value::Null => Ok(Value::Bool(false)),
        Value::Bool(_) => Ok(value),
        Value::Number(n) => Ok(Value::Bool(n != 0.0)),
        Value::String(s) => Ok(Value::Bool(!s.is_empty())),
        Value::Date(_) | Value::Array(_) | Value::Object(_) => reject(ErrorKind::Invalid),
    }
}

fn cast_date(value: Value) -> Result<Value> {
    let date = match value {
        Value::Undefined | Value::Null => Some(Utc::now()),
        Value::Date(d) => Some(d),
        Value::Number(secs) => from_epoch_seconds(secs),
        Value::String(s) => parse_date(&s),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    };
    date.map(Value::Date).ok_or(ValidationError::new(ErrorKind::Invalid))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    // chrono's range ends well before this, so the cast below cannot wrap.
    const LIMIT: f64 = 1.0e15;
    if !secs.is_finite() || secs.abs() > LIMIT {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1.0e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

// Offsets may be `+02:00`, `+0200` or `+02`.
const ZONED_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y%m%dT%H%M%S%.f%#z",
];

// No zone, or a trailing `Z` already stripped: read as UTC.
const LOCAL_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }

    let local = match raw.strip_suffix(['Z', 'z']) {
        Some(rest) => rest,
        None => {
            let zoned = ZONED_FORMATS.iter().find_map(|format| DateTime::parse_from_str(raw, format).ok());
            if let Some(date) = zoned {
                return Some(date.with_timezone(&Utc));
            }
            raw
        }
    };

    LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(local, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(local, format).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Strict type membership. Nothing is coerced.
///
/// # Errors
///
/// The matching `NO<TYPE>` kind, e.g. `NOINTEGER` for `1.5`.
pub fn expect_type(type_name: TypeName, value: Value) -> Result<Value> {
    let ok = match (&value, type_name) {
        (Value::String(_), TypeName::String)
        | (Value::Bool(_), TypeName::Boolean)
        | (Value::Array(_), TypeName::Array)
        | (Value::Object(_), TypeName::Object)
        | (Value::Date(_), TypeName::Date) => true,
        (Value::Number(n), TypeName::Number) => n.is_finite(),
        (Value::Number(n), TypeName::Integer) => n.is_finite() && n.fract() == 0.0,
        _ => false,
    };
    if ok { Ok(value) } else { reject(type_name.mismatch()) }
}

fn measured_len(value: &Value) -> Result<usize> {
    if value.is_nullish() {
        return reject(ErrorKind::Missing);
    }
    match value {
        Value::String(s) => Ok(s.chars().count()),
        Value::Array(items) => Ok(items.len()),
        _ => reject(ErrorKind::Invalid),
    }
}

/// Minimum length of a string (in characters) or array (in elements).
///
/// # Errors
///
/// `MISSING` for nullish input, `INVALID` for anything but strings and
/// arrays, `TOOSHORT` below the bound.
pub fn min_length(length: usize, value: Value) -> Result<Value> {
    if measured_len(&value)? < length { reject(ErrorKind::TooShort) } else { Ok(value) }
}

/// Maximum length of a string (in characters) or array (in elements).
///
/// # Errors
///
/// `MISSING` for nullish input, `INVALID` for anything but strings and
/// arrays, `TOOLONG` above the bound.
pub fn max_length(length: usize, value: Value) -> Result<Value> {
    if measured_len(&value)? > length { reject(ErrorKind::TooLong) } else { Ok(value) }
}

/// Regular-expression match on strings.
///
/// # Errors
///
/// `MISSING` for nullish input, `INVALID` for non-strings, `WRONGFORMAT`
/// when the pattern does not match.
pub fn matches(regex: &Regex, value: Value) -> Result<Value> {
    if value.is_nullish() {
        return reject(ErrorKind::Missing);
    }
    match &value {
        Value::String(s) if regex.is_match(s) => Ok(value),
        Value::String(_) => reject(ErrorKind::WrongFormat),
        _ => reject(ErrorKind::Invalid),
    }
}

/// Rejects strings that are empty after trimming whitespace.
///
/// # Errors
///
/// `MISSING` for nullish input, `INVALID` for non-strings, `EMPTY` for
/// whitespace-only strings.
pub fn not_blank(value: Value) -> Result<Value> {
    if value.is_nullish() {
        return reject(ErrorKind::Missing);
    }
    match &value {
        Value::String(s) if s.trim().is_empty() => reject(ErrorKind::Empty),
        Value::String(_) => Ok(value),
        _ => reject(ErrorKind::Invalid),
    }
}

/// Apply an arbitrary caller predicate.
///
/// # Errors
///
/// Whatever `predicate` returns.
pub fn check<T, E>(value: Value, predicate: impl FnOnce(Value) -> std::result::Result<T, E>) -> std::result::Result<T, E> {
    predicate(value)
}

/// Apply an arbitrary infallible transformation.
#[must_use]
pub fn transform(value: Value, transformer: impl FnOnce(Value) -> Value) -> Value {
    transformer(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn kind<T: fmt::Debug>(result: Result<T>) -> ErrorKind {
        result.expect_err("check should fail").kind()
    }

    fn date(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn odd_shapes() -> Vec<Value> {
        vec![
            Value::from(0),
            Value::from(0.5),
            Value::Date(Utc::now()),
            Value::from(true),
            Value::from(false),
            Value::from(json!({})),
        ]
    }

    #[test]
    fn test_optional_passes_missing_optional_values_as_absent() {
        assert_eq!(optional(true, Value::Null), Ok(None));
        assert_eq!(optional(true, Value::Undefined), Ok(None));
        assert_eq!(optional(true, Value::from("")), Ok(None));
    }

    #[test]
    fn test_optional_passes_present_values() {
        assert_eq!(optional(false, Value::from("TEST")), Ok(Some(Value::from("TEST"))));
        assert_eq!(optional(false, Value::from(0)), Ok(Some(Value::from(0))));
        assert_eq!(optional(true, Value::from(0)), Ok(Some(Value::from(0))));
    }

    #[test]
    fn test_optional_rejects_missing_required_values() {
        assert_eq!(kind(optional(false, Value::Null)), ErrorKind::Missing);
        assert_eq!(kind(optional(false, Value::Undefined)), ErrorKind::Missing);
        assert_eq!(kind(optional(false, Value::from(""))), ErrorKind::Missing);
    }

    #[test]
    fn test_cast_to_string() {
        assert_eq!(cast(CastTarget::String, Value::Null), Ok(Value::from("")));
        assert_eq!(cast(CastTarget::String, Value::Undefined), Ok(Value::from("")));
        assert_eq!(cast(CastTarget::String, Value::from("TEST")), Ok(Value::from("TEST")));
        assert_eq!(cast(CastTarget::String, Value::from(0)), Ok(Value::from("0")));
        assert_eq!(cast(CastTarget::String, Value::from(true)), Ok(Value::from("true")));
        assert_eq!(
            cast(CastTarget::String, Value::Date(date("2017-10-08T01:23:45Z"))),
            Ok(Value::from("2017-10-08T01:23:45.000Z"))
        );
    }

    #[test]
    fn test_cast_to_string_rejects_containers() {
        assert_eq!(kind(cast(CastTarget::String, Value::from(json!({})))), ErrorKind::Invalid);
        assert_eq!(kind(cast(CastTarget::String, Value::from(json!([])))), ErrorKind::Invalid);
    }

    #[test]
    fn test_cast_to_number() {
        assert_eq!(cast(CastTarget::Number, Value::Null), Ok(Value::Number(0.0)));
        assert_eq!(cast(CastTarget::Number, Value::Undefined), Ok(Value::Number(0.0)));
        assert_eq!(cast(CastTarget::Number, Value::from(true)), Ok(Value::Number(1.0)));
        assert_eq!(cast(CastTarget::Number, Value::from(false)), Ok(Value::Number(0.0)));
        assert_eq!(cast(CastTarget::Number, Value::from("12345")), Ok(Value::Number(12345.0)));
        assert_eq!(cast(CastTarget::Number, Value::from("12345.1")), Ok(Value::Number(12345.1)));
    }

    #[test]
    fn test_cast_to_number_rejects_garbage_and_non_finite() {
        for input in [
            Value::from(json!({})),
            Value::from(json!([])),
            Value::from("NaN"),
            Value::from("TESTTEST"),
            Value::from("inf"),
            Value::from("-infinity"),
            Value::Number(f64::NAN),
            Value::Number(f64::INFINITY),
        ] {
            assert_eq!(kind(cast(CastTarget::Number, input)), ErrorKind::Invalid);
        }
    }

    #[test]
    fn test_cast_to_integer_floors() {
        assert_eq!(cast(CastTarget::Integer, Value::from("12.9")), Ok(Value::Number(12.0)));
        assert_eq!(cast(CastTarget::Integer, Value::from(-1.5)), Ok(Value::Number(-2.0)));
    }

    #[test]
    fn test_cast_to_boolean() {
        assert_eq!(cast(CastTarget::Boolean, Value::Null), Ok(Value::from(false)));
        assert_eq!(cast(CastTarget::Boolean, Value::from(0)), Ok(Value::from(false)));
        assert_eq!(cast(CastTarget::Boolean, Value::from(2)), Ok(Value::from(true)));
        assert_eq!(cast(CastTarget::Boolean, Value::from("0")), Ok(Value::from(true)));
        assert_eq!(cast(CastTarget::Boolean, Value::from("")), Ok(Value::from(false)));
        assert_eq!(kind(cast(CastTarget::Boolean, Value::from(json!([])))), ErrorKind::Invalid);
    }

    #[test]
    fn test_cast_to_date() {
        assert!(matches!(cast(CastTarget::Date, Value::Null), Ok(Value::Date(_))));
        assert_eq!(
            cast(CastTarget::Date, Value::from(1_495_649_067)),
            Ok(Value::Date(DateTime::from_timestamp(1_495_649_067, 0).unwrap()))
        );
        assert_eq!(
            cast(CastTarget::Date, Value::from("2017-08-13T22:33:00.000Z")),
            Ok(Value::Date(date("2017-08-13T22:33:00Z")))
        );
        assert_eq!(
            cast(CastTarget::Date, Value::from("2017-08-13")),
            Ok(Value::Date(date("2017-08-13T00:00:00Z")))
        );
    }

    #[test]
    fn test_cast_to_date_accepts_iso_8601_variants() {
        for (input, expected) in [
            ("2017-08-13T22:33:00+0200", "2017-08-13T20:33:00Z"),
            ("2017-08-13T22:33:00.000+02", "2017-08-13T20:33:00Z"),
            ("2017-08-13T22:33+02:00", "2017-08-13T20:33:00Z"),
            ("2017-08-13T22:33Z", "2017-08-13T22:33:00Z"),
            ("2017-08-13T22:33", "2017-08-13T22:33:00Z"),
            ("2017-08-13 22:33:00", "2017-08-13T22:33:00Z"),
            ("20170813T223300Z", "2017-08-13T22:33:00Z"),
            ("20170813T223300+0200", "2017-08-13T20:33:00Z"),
            ("20170813", "2017-08-13T00:00:00Z"),
        ] {
            assert_eq!(cast(CastTarget::Date, Value::from(input)), Ok(Value::Date(date(expected))), "{input}");
        }
    }

    #[test]
    fn test_cast_to_date_rejects_unparsable() {
        assert_eq!(kind(cast(CastTarget::Date, Value::from("yesterday"))), ErrorKind::Invalid);
        assert_eq!(kind(cast(CastTarget::Date, Value::from(json!({})))), ErrorKind::Invalid);
        assert_eq!(kind(cast(CastTarget::Date, Value::from(json!([])))), ErrorKind::Invalid);
    }

    #[test]
    fn test_expect_type_string() {
        assert!(expect_type(TypeName::String, Value::from("TEST")).is_ok());
        for input in [Value::Null, Value::Undefined, Value::from(0), Value::from(true), Value::from(json!([]))] {
            assert_eq!(kind(expect_type(TypeName::String, input)), ErrorKind::NoString);
        }
    }

    #[test]
    fn test_expect_type_integer() {
        assert!(expect_type(TypeName::Integer, Value::from(1)).is_ok());
        for input in [Value::from("TEST"), Value::from(true), Value::from(123.5), Value::Null, Value::Number(f64::NAN)] {
            assert_eq!(kind(expect_type(TypeName::Integer, input)), ErrorKind::NoInteger);
        }
    }

    #[test]
    fn test_expect_type_number_rejects_non_finite() {
        assert!(expect_type(TypeName::Number, Value::from(0)).is_ok());
        assert_eq!(kind(expect_type(TypeName::Number, Value::Number(f64::INFINITY))), ErrorKind::NoNumber);
        assert_eq!(kind(expect_type(TypeName::Number, Value::from("1"))), ErrorKind::NoNumber);
    }

    #[test]
    fn test_expect_type_object_excludes_arrays_and_dates() {
        assert!(expect_type(TypeName::Object, Value::from(json!({"a": 1}))).is_ok());
        assert_eq!(kind(expect_type(TypeName::Object, Value::from(json!([])))), ErrorKind::NoObject);
        assert_eq!(kind(expect_type(TypeName::Object, Value::Date(Utc::now()))), ErrorKind::NoObject);
        assert_eq!(kind(expect_type(TypeName::Object, Value::Null)), ErrorKind::NoObject);
    }

    #[test]
    fn test_expect_type_boolean_array_date() {
        assert!(expect_type(TypeName::Boolean, Value::from(false)).is_ok());
        assert_eq!(kind(expect_type(TypeName::Boolean, Value::from(0))), ErrorKind::NoBoolean);
        assert!(expect_type(TypeName::Array, Value::from(json!([0, 1]))).is_ok());
        assert_eq!(kind(expect_type(TypeName::Array, Value::from(json!({})))), ErrorKind::NoArray);
        assert!(expect_type(TypeName::Date, Value::Date(Utc::now())).is_ok());
        assert_eq!(kind(expect_type(TypeName::Date, Value::from(1.2))), ErrorKind::NoDate);
    }

    #[test]
    fn test_min_length_bounds() {
        assert!(min_length(10, Value::from("1234567890")).is_ok());
        assert!(min_length(2, Value::from(json!([1, 2]))).is_ok());
        assert_eq!(kind(min_length(10, Value::from("123456789"))), ErrorKind::TooShort);
        assert_eq!(kind(min_length(2, Value::from(json!([12])))), ErrorKind::TooShort);
        assert_eq!(kind(min_length(2, Value::Null)), ErrorKind::Missing);
        assert_eq!(kind(min_length(2, Value::Undefined)), ErrorKind::Missing);
    }

    #[test]
    fn test_max_length_bounds() {
        assert!(max_length(10, Value::from("1234567890")).is_ok());
        assert!(max_length(2, Value::from(json!([1]))).is_ok());
        assert_eq!(kind(max_length(10, Value::from("12345678901"))), ErrorKind::TooLong);
        assert_eq!(kind(max_length(2, Value::from(json!([12, 13, 14])))), ErrorKind::TooLong);
        assert_eq!(kind(max_length(2, Value::Null)), ErrorKind::Missing);
    }

    #[test]
    fn test_lengths_count_characters() {
        assert!(max_length(4, Value::from("größe")).is_err());
        assert!(max_length(5, Value::from("größe")).is_ok());
    }

    #[test]
    fn test_lengths_reject_other_shapes() {
        for input in odd_shapes() {
            assert_eq!(kind(min_length(2, input.clone())), ErrorKind::Invalid);
            assert_eq!(kind(max_length(2, input)), ErrorKind::Invalid);
        }
    }

    #[test]
    fn test_matches() {
        let exact = Regex::new("^abcd$").unwrap();
        assert!(matches(&exact, Value::from("abcd")).is_ok());
        assert_eq!(kind(matches(&exact, Value::from("abcde"))), ErrorKind::WrongFormat);
        assert_eq!(kind(matches(&exact, Value::Null)), ErrorKind::Missing);
        for input in odd_shapes() {
            assert_eq!(kind(matches(&exact, input)), ErrorKind::Invalid);
        }
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank(Value::from("12223423")).is_ok());
        assert_eq!(kind(not_blank(Value::from("    "))), ErrorKind::Empty);
        assert_eq!(kind(not_blank(Value::from(""))), ErrorKind::Empty);
        for input in odd_shapes() {
            assert_eq!(kind(not_blank(input)), ErrorKind::Invalid);
        }
    }

    #[test]
    fn test_check_and_transform_delegate() {
        let upper = transform(Value::from("abc"), |v| Value::from(v.as_str().unwrap_or_default().to_uppercase()));
        assert_eq!(upper, Value::from("ABC"));
        let rejected: Result<Value> = check(Value::from(3), |_| reject(ErrorKind::Invalid));
        assert_eq!(kind(rejected), ErrorKind::Invalid);
    }

    const CAST_TARGETS: [CastTarget; 5] =
        [CastTarget::String, CastTarget::Number, CastTarget::Integer, CastTarget::Boolean, CastTarget::Date];

    #[test]
    fn test_cast_of_missing_is_zero_value() {
        for missing in [Value::Undefined, Value::Null] {
            assert_eq!(cast(CastTarget::String, missing.clone()), Ok(Value::from("")));
            assert_eq!(cast(CastTarget::Number, missing.clone()), Ok(Value::Number(0.0)));
            assert_eq!(cast(CastTarget::Integer, missing.clone()), Ok(Value::Number(0.0)));
            assert_eq!(cast(CastTarget::Boolean, missing.clone()), Ok(Value::from(false)));
            assert!(matches!(cast(CastTarget::Date, missing), Ok(Value::Date(_))));
        }
    }

    fn arb_castable() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Undefined),
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-1.0e12..1.0e12f64).prop_map(Value::Number),
            "[ 0-9.a-zA-Z:+-]{0,24}".prop_map(Value::String),
            (-1.0e9..1.0e9f64).prop_map(|n| Value::String(n.to_string())),
            (0i64..4_000_000_000).prop_map(|secs| Value::Date(DateTime::from_timestamp(secs, 0).unwrap())),
        ]
    }

    proptest! {
        #[test]
        fn prop_cast_result_satisfies_its_type(
            target in proptest::sample::select(CAST_TARGETS.to_vec()),
            value in arb_castable(),
        ) {
            if let Ok(cast_value) = cast(target, value) {
                prop_assert!(expect_type(target.type_name(), cast_value).is_ok());
            }
        }

        #[test]
        fn prop_missing_always_casts(target in proptest::sample::select(CAST_TARGETS.to_vec())) {
            for missing in [Value::Undefined, Value::Null] {
                let cast_value = cast(target, missing);
                prop_assert!(cast_value.is_ok());
                prop_assert!(expect_type(target.type_name(), cast_value.unwrap()).is_ok());
            }
        }
    }

    #[test]
    fn test_type_names_parse() {
        assert_eq!("integer".parse::<TypeName>(), Ok(TypeName::Integer));
        assert_eq!("date".parse::<CastTarget>(), Ok(CastTarget::Date));
        assert!("array".parse::<CastTarget>().is_err());
    }
}
