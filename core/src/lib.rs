//! # Restguard Core
//!
//! Framework-free building blocks for validating HTTP input and shaping
//! HTTP output.
//!
//! ## Core Concepts
//!
//! - **Value**: closed tagged tree standing in for any request or response datum
//! - **Checks**: pure coercion and validation primitives on a single [`Value`]
//! - **Rules**: declarative chain of checks with a fixed evaluation order
//! - **Serializer**: recursive, idempotent response normalization
//! - **Environment**: injected dependencies ([`environment::Clock`])
//! - **Events**: fire-and-forget notification sink
//!
//! Nothing here knows about HTTP; `restguard-web` binds these pieces to
//! request locations and status codes.
//!
//! ## Example
//!
//! ```
//! use restguard_core::checks::{self, CastTarget};
//! use restguard_core::{ErrorKind, Value};
//!
//! let limit = checks::cast(CastTarget::Integer, Value::from("25.7"));
//! assert_eq!(limit, Ok(Value::from(25)));
//!
//! let err = checks::cast(CastTarget::Number, Value::from("abc")).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Invalid);
//! ```

pub mod casing;
pub mod checks;
pub mod environment;
pub mod error;
pub mod events;
pub mod rules;
pub mod serializer;
pub mod value;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{CheckError, ErrorKind, ValidationError};
pub use rules::{Predicate, Rules};
pub use serializer::serialize;
pub use value::{Map, Value};
