//! Field predicates and the canonical rule chain.
//!
//! A [`Predicate`] turns one request value into its validated form. Any
//! closure `Fn(Value) -> Result<Value, CheckError>` is a predicate; [`Rules`]
//! is the declarative alternative covering the common checks.
//!
//! # Evaluation order
//!
//! Whatever order the builder methods are called in, [`Rules`] always runs:
//!
//! ```text
//! cast → type → transform → check → not_blank → min_length → max_length → pattern
//! ```
//!
//! # Example
//!
//! ```
//! use restguard_core::checks::CastTarget;
//! use restguard_core::rules::{Predicate, Rules};
//! use restguard_core::Value;
//!
//! let username = Rules::new()
//!     .cast(CastTarget::String)
//!     .transform(|v| Value::from(v.as_str().unwrap_or_default().trim().to_lowercase()))
//!     .not_blank()
//!     .min_length(3)
//!     .max_length(32);
//!
//! assert_eq!(username.apply(Value::from("  Alice ")).ok(), Some(Value::from("alice")));
//! assert!(username.apply(Value::from("al")).is_err());
//! ```

use crate::checks::{self, CastTarget, TypeName};
use crate::error::CheckError;
use crate::value::Value;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Validates and possibly transforms a single value.
///
/// Predicates are built once at route registration and shared read-only by
/// every request, hence `Send + Sync + 'static`.
pub trait Predicate: Send + Sync + 'static {
    /// Validate `value`, returning the value to store back into the request.
    ///
    /// # Errors
    ///
    /// [`CheckError::Validation`] for bad input, [`CheckError::Defect`] for
    /// failures of the predicate itself.
    fn apply(&self, value: Value) -> Result<Value, CheckError>;
}

impl<F> Predicate for F
where
    F: Fn(Value) -> Result<Value, CheckError> + Send + Sync + 'static,
{
    fn apply(&self, value: Value) -> Result<Value, CheckError> {
        self(value)
    }
}

type TransformFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;
type CheckFn = Arc<dyn Fn(Value) -> Result<Value, CheckError> + Send + Sync>;

/// Declarative rule chain. See the module docs for the evaluation order.
#[derive(Clone, Default)]
pub struct Rules {
    cast: Option<CastTarget>,
    type_name: Option<TypeName>,
    transform: Option<TransformFn>,
    check: Option<CheckFn>,
    not_blank: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
}

impl Rules {
    /// Empty chain; accepts every present value unchanged.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerce first.
    #[must_use]
    pub const fn cast(mut self, target: CastTarget) -> Self {
        self.cast = Some(target);
        self
    }

    /// Require a type (after casting, if any).
    #[must_use]
    pub const fn expect_type(mut self, type_name: TypeName) -> Self {
        self.type_name = Some(type_name);
        self
    }

    /// Rewrite the value before the remaining checks see it.
    #[must_use]
    pub fn transform(mut self, transformer: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(transformer));
        self
    }

    /// Run a caller check.
    #[must_use]
    pub fn check(mut self, predicate: impl Fn(Value) -> Result<Value, CheckError> + Send + Sync + 'static) -> Self {
        self.check = Some(Arc::new(predicate));
        self
    }

    /// Reject whitespace-only strings.
    #[must_use]
    pub const fn not_blank(mut self) -> Self {
        self.not_blank = true;
        self
    }

    /// Minimum length.
    #[must_use]
    pub const fn min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }

    /// Maximum length.
    #[must_use]
    pub const fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Require the value to match `pattern`.
    #[must_use]
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }
}

impl Predicate for Rules {
    fn apply(&self, mut value: Value) -> Result<Value, CheckError> {
        if let Some(target) = self.cast {
            value = checks::cast(target, value)?;
        }
        if let Some(type_name) = self.type_name {
            value = checks::expect_type(type_name, value)?;
        }
        if let Some(transformer) = &self.transform {
            value = checks::transform(value, |v| transformer(v));
        }
        if let Some(predicate) = &self.check {
            value = checks::check(value, |v| predicate(v))?;
        }
        if self.not_blank {
            value = checks::not_blank(value)?;
        }
        if let Some(length) = self.min_length {
            value = checks::min_length(length, value)?;
        }
        if let Some(length) = self.max_length {
            value = checks::max_length(length, value)?;
        }
        if let Some(pattern) = &self.pattern {
            value = checks::matches(pattern, value)?;
        }
        Ok(value)
    }
}

impl fmt::Debug for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rules")
            .field("cast", &self.cast)
            .field("type_name", &self.type_name)
            .field("transform", &self.transform.is_some())
            .field("check", &self.check.is_some())
            .field("not_blank", &self.not_blank)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern.as_ref().map(Regex::as_str))
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn rejected_kind(rules: &Rules, value: Value) -> ErrorKind {
        match rules.apply(value) {
            Err(CheckError::Validation(err)) => err.kind(),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_rules_pass_through() {
        assert_eq!(Rules::new().apply(Value::from(5)).unwrap(), Value::from(5));
    }

    #[test]
    fn test_cast_runs_before_type() {
        let rules = Rules::new().expect_type(TypeName::Integer).cast(CastTarget::Integer);
        assert_eq!(rules.apply(Value::from("41.9")).unwrap(), Value::Number(41.0));
    }

    #[test]
    fn test_transform_runs_before_length_checks() {
        let rules = Rules::new()
            .max_length(3)
            .transform(|v| Value::from(v.as_str().unwrap_or_default().trim().to_owned()));
        assert_eq!(rules.apply(Value::from("  abc  ")).unwrap(), Value::from("abc"));
    }

    #[test]
    fn test_not_blank_runs_before_min_length() {
        let rules = Rules::new().min_length(10).not_blank();
        assert_eq!(rejected_kind(&rules, Value::from("   ")), ErrorKind::Empty);
    }

    #[test]
    fn test_pattern_runs_last() {
        let rules = Rules::new().pattern(Regex::new("^[a-z]+$").unwrap()).max_length(2);
        assert_eq!(rejected_kind(&rules, Value::from("ABCDEF")), ErrorKind::TooLong);
        assert_eq!(rejected_kind(&rules, Value::from("AB")), ErrorKind::WrongFormat);
    }

    #[test]
    fn test_check_defect_is_not_a_validation_error() {
        let rules = Rules::new().check(|_| Err(CheckError::defect("boom")));
        assert!(matches!(rules.apply(Value::from(1)), Err(CheckError::Defect(_))));
    }

    #[test]
    fn test_closures_are_predicates() {
        let predicate = |v: Value| -> Result<Value, CheckError> { Ok(checks::not_blank(v)?) };
        assert!(predicate.apply(Value::from("x")).is_ok());
        assert!(predicate.apply(Value::from(" ")).is_err());
    }
}
