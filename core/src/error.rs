//! Error types for validation checks.

use std::fmt;
use thiserror::Error;

/// Result type alias for a single check.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Why a value was rejected.
///
/// The `Display` form is the upper-case token that ends up in error codes
/// such as `ERR_BODY_EMAIL_TOOSHORT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Required value is absent, `null` or `""`.
    Missing,
    /// Value has a shape the check cannot work with.
    Invalid,
    /// Expected a string.
    NoString,
    /// Expected a finite number.
    NoNumber,
    /// Expected a finite whole number.
    NoInteger,
    /// Expected a boolean.
    NoBoolean,
    /// Expected an array.
    NoArray,
    /// Expected an object (not an array or date).
    NoObject,
    /// Expected a date.
    NoDate,
    /// Below the minimum length.
    TooShort,
    /// Above the maximum length.
    TooLong,
    /// Does not match the required pattern.
    WrongFormat,
    /// Only whitespace.
    Empty,
}

impl ErrorKind {
    /// The upper-case wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "MISSING",
            Self::Invalid => "INVALID",
            Self::NoString => "NOSTRING",
            Self::NoNumber => "NONUMBER",
            Self::NoInteger => "NOINTEGER",
            Self::NoBoolean => "NOBOOLEAN",
            Self::NoArray => "NOARRAY",
            Self::NoObject => "NOOBJECT",
            Self::NoDate => "NODATE",
            Self::TooShort => "TOOSHORT",
            Self::TooLong => "TOOLONG",
            Self::WrongFormat => "WRONGFORMAT",
            Self::Empty => "EMPTY",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value failed a check.
///
/// This is the only error the checks in [`crate::checks`] produce. It is
/// always the client's fault and always maps to a 4xx response.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{kind}")]
pub struct ValidationError {
    kind: ErrorKind,
}

impl ValidationError {
    /// Create a validation error of the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    /// The rejection reason.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<ErrorKind> for ValidationError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Failure of a field predicate.
///
/// Predicates compose checks with arbitrary caller code. Anything that is not
/// a [`ValidationError`] is a bug in that code, reported as a 500 and never
/// dressed up as bad client input.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The value was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The predicate itself misbehaved.
    #[error("predicate defect: {0}")]
    Defect(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CheckError {
    /// Wrap an unexpected failure raised inside a predicate.
    pub fn defect(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Defect(err.into())
    }
}

impl From<ErrorKind> for CheckError {
    fn from(kind: ErrorKind) -> Self {
        Self::Validation(ValidationError::new(kind))
    }
}
