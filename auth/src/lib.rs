//! # Restguard Authentication
//!
//! Stateless bearer session verification.
//!
//! ## Features
//!
//! - **Verification only**: tokens are issued elsewhere; this crate checks them
//! - **RS256**: asymmetric signatures, the verifier only ever holds a public key
//! - **Injected time**: validity windows are checked against a [`Clock`]
//! - **Tiered errors**: invalid (403) and expired (410) are told apart
//!
//! ## Flow
//!
//! ```text
//! Authorization: Bearer <jwt> → PublicKeyProvider → signature → claims → window
//! ```
//!
//! ## Example
//!
//! ```rust
//! use restguard_auth::{JwtSessionVerifier, SessionError, SessionVerifier, StaticKeyProvider};
//!
//! # async fn run(pem: &[u8]) -> Result<(), SessionError> {
//! let verifier = JwtSessionVerifier::new(StaticKeyProvider::from_rsa_pem(pem)?);
//!
//! match verifier.verify("not-a-token").await {
//!     Err(SessionError::Invalid { .. }) => {}
//!     other => unreachable!("{other:?}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`Clock`]: restguard_core::environment::Clock

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod claims;
pub mod config;
pub mod error;
pub mod keys;
pub mod verifier;

// Re-exports
pub use claims::SessionClaims;
pub use config::{DEFAULT_REALM, SessionConfig};
pub use error::{KeyError, Result, SessionError};
pub use keys::{PemFileKeyProvider, PublicKeyProvider, StaticKeyProvider};
pub use verifier::{JwtSessionVerifier, SessionVerifier};
