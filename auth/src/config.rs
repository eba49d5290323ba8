//! Session verification configuration.
//!
//! Values are provided by the application, usually deserialized from its
//! own config file, never read from the environment here.

use serde::Deserialize;
use std::time::Duration;

/// Default challenge realm advertised on 401 responses.
pub const DEFAULT_REALM: &str = "Retrieve a session token by login first";

/// Bearer session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Realm in the `WWW-Authenticate: Bearer realm="..."` challenge.
    pub realm: String,

    /// Upper bound for one verification, key loading included.
    ///
    /// Default: 5000 ms
    pub verify_timeout_ms: u64,

    /// Clock skew tolerated on both ends of the validity window.
    ///
    /// Default: 0 s
    pub leeway_secs: u64,
}

impl SessionConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the challenge realm.
    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    /// Set the verification timeout.
    #[must_use]
    pub const fn with_verify_timeout_ms(mut self, millis: u64) -> Self {
        self.verify_timeout_ms = millis;
        self
    }

    /// Set the clock leeway.
    #[must_use]
    pub const fn with_leeway_secs(mut self, secs: u64) -> Self {
        self.leeway_secs = secs;
        self
    }

    /// [`Self::verify_timeout_ms`] as a `Duration`.
    #[must_use]
    pub const fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }

    /// [`Self::leeway_secs`] as a `Duration`.
    #[must_use]
    pub const fn leeway(&self) -> Duration {
        Duration::from_secs(self.leeway_secs)
    }

    /// The full `WWW-Authenticate` value.
    ///
    /// ```
    /// # use restguard_auth::SessionConfig;
    /// assert_eq!(
    ///     SessionConfig::new().with_realm("api").challenge(),
    ///     r#"Bearer realm="api""#
    /// );
    /// ```
    #[must_use]
    pub fn challenge(&self) -> String {
        format!("Bearer realm=\"{}\"", self.realm.replace('"', "'"))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            realm: DEFAULT_REALM.to_string(),
            verify_timeout_ms: 5000,
            leeway_secs: 0,
        }
    }
}
