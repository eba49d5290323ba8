//! Error types for session verification.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Why a bearer token was not accepted.
///
/// The first two variants are the client's problem and map to 403 and 410.
/// Everything else is ours and maps to 500.
#[derive(Debug, Error)]
pub enum SessionError {
    // ═══════════════════════════════════════════════════════════
    // Client Errors
    // ═══════════════════════════════════════════════════════════

    /// Bad signature, unreadable token or claims outside a sane window.
    #[error("Invalid session token: {reason}")]
    Invalid {
        /// What was wrong, for logs only
        reason: String,
    },

    /// Signature fine, session lapsed.
    #[error("Session token has expired")]
    Expired,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// The verification key could not be obtained.
    #[error("Session key unavailable: {0}")]
    Key(#[from] KeyError),

    /// Verification did not finish in time.
    #[error("Session verification timed out")]
    Timeout,

    /// Any other verifier fault.
    #[error("Session verification failed: {0}")]
    Internal(String),
}

impl SessionError {
    /// Shorthand for [`SessionError::Invalid`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid { reason: reason.into() }
    }

    /// Returns `true` if the token itself was rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// # use restguard_auth::SessionError;
    /// assert!(SessionError::Expired.is_client_error());
    /// assert!(!SessionError::Timeout.is_client_error());
    /// ```
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Invalid { .. } | Self::Expired)
    }
}

/// Failure to load a verification key.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Key file could not be read.
    #[error("Failed to read key file {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Key material is not a usable RSA public key.
    #[error("Invalid public key: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}
