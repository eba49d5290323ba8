//! Bearer token verification.
//!
//! [`SessionVerifier`] is the seam the web layer depends on: a token string
//! goes in, [`SessionClaims`] or a [`SessionError`] come out.
//! [`JwtSessionVerifier`] is the production implementation for RS256 JWTs.
//!
//! # Example
//!
//! ```no_run
//! use restguard_auth::{JwtSessionVerifier, SessionConfig, SessionVerifier, PemFileKeyProvider};
//!
//! # async fn run() -> Result<(), restguard_auth::SessionError> {
//! let verifier = JwtSessionVerifier::new(PemFileKeyProvider::new("keys/session.pub.pem"))
//!     .with_config(&SessionConfig::default());
//!
//! let claims = verifier.verify("eyJhbGciOiJSUzI1NiJ9...").await?;
//! println!("session {}", claims.session_id);
//! # Ok(())
//! # }
//! ```

use crate::claims::SessionClaims;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::keys::PublicKeyProvider;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, Validation};
use restguard_core::environment::{Clock, SystemClock};
use serde_json::{Map, Value as Json};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Turns a bearer token into verified claims.
pub trait SessionVerifier: Send + Sync {
    /// Verify signature and validity window of `token`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Invalid`] for bad signatures, unreadable tokens or
    ///   claims outside a sane window
    /// - [`SessionError::Expired`] once the window has closed
    /// - any other variant for faults of the verifier itself
    fn verify(&self, token: &str) -> impl Future<Output = Result<SessionClaims>> + Send;

    /// Adopt the parts of `config` this verifier understands.
    ///
    /// Guard factories call this with the API's session settings before
    /// installing the verifier. The default keeps the verifier as it is.
    #[must_use]
    fn with_config(self, _config: &SessionConfig) -> Self
    where
        Self: Sized,
    {
        self
    }
}

impl<V: SessionVerifier> SessionVerifier for Arc<V> {
    fn verify(&self, token: &str) -> impl Future<Output = Result<SessionClaims>> + Send {
        (**self).verify(token)
    }
}

/// RS256 JWT verifier.
///
/// Signature checking is delegated to `jsonwebtoken`; the time window is
/// checked here against the injected [`Clock`] so tests can pin "now".
pub struct JwtSessionVerifier<P, C = SystemClock> {
    keys: P,
    clock: C,
    leeway: Duration,
    validation: Validation,
}

impl<P: PublicKeyProvider> JwtSessionVerifier<P> {
    /// Verifier using the wall clock and no leeway.
    #[must_use]
    pub fn new(keys: P) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();
        Self { keys, clock: SystemClock, leeway: Duration::ZERO, validation }
    }
}

impl<P: PublicKeyProvider, C: Clock> JwtSessionVerifier<P, C> {
    /// Replace the clock.
    #[must_use]
    pub fn with_clock<C2: Clock>(self, clock: C2) -> JwtSessionVerifier<P, C2> {
        JwtSessionVerifier { keys: self.keys, clock, leeway: self.leeway, validation: self.validation }
    }

    /// Tolerate `leeway` of clock skew.
    #[must_use]
    pub const fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    fn decode(&self, token: &str, key: &jsonwebtoken::DecodingKey) -> Result<SessionClaims> {
        let data = jsonwebtoken::decode::<Map<String, Json>>(token, key, &self.validation)
            .map_err(classify)?;
        let claims = SessionClaims::from_raw(data.claims)?;
        claims.validate_window(self.clock.now(), self.leeway)?;
        Ok(claims)
    }
}

impl<P: PublicKeyProvider, C: Clock> SessionVerifier for JwtSessionVerifier<P, C> {
    fn verify(&self, token: &str) -> impl Future<Output = Result<SessionClaims>> + Send {
        async move {
            let key = self.keys.decoding_key().await?;
            let result = self.decode(token, &key);
            if let Err(err) = &result {
                tracing::debug!(error = %err, "session token rejected");
            }
            result
        }
    }

    /// Widens the leeway to the configured one. A larger leeway set with
    /// [`JwtSessionVerifier::with_leeway`] is kept.
    fn with_config(self, config: &SessionConfig) -> Self {
        let leeway = self.leeway.max(config.leeway());
        self.with_leeway(leeway)
    }
}

impl<P: fmt::Debug, C> fmt::Debug for JwtSessionVerifier<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSessionVerifier")
            .field("keys", &self.keys)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

/// Sort `jsonwebtoken` failures into client and server faults.
fn classify(err: jsonwebtoken::errors::Error) -> SessionError {
    match err.kind() {
        JwtErrorKind::ExpiredSignature => SessionError::Expired,
        JwtErrorKind::InvalidRsaKey(_)
        | JwtErrorKind::InvalidKeyFormat
        | JwtErrorKind::InvalidEcdsaKey
        | JwtErrorKind::Crypto(_) => SessionError::Internal(err.to_string()),
        _ => SessionError::invalid(err.to_string()),
    }
}
