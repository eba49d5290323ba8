//! # Restguard Testing
//!
//! Testing utilities and fixtures for Restguard.
//!
//! This crate provides:
//! - `FixedClock` and `test_clock` for deterministic session windows
//! - RSA key fixtures and a session token minter
//! - `RecordingSink`, an event sink that remembers what it was told
//! - `init_test_tracing` for readable test logs
//!
//! ## Example
//!
//! ```
//! use restguard_testing::tokens::{TokenBuilder, SESSION_PUBLIC_PEM};
//! use restguard_testing::test_clock;
//! use restguard_core::environment::Clock;
//!
//! let now = test_clock().now().timestamp();
//! let token = TokenBuilder::new("sess-1")
//!     .subject(1, "testman")
//!     .window(now, now + 3600)
//!     .mint();
//!
//! assert_eq!(token.split('.').count(), 3);
//! assert!(SESSION_PUBLIC_PEM.contains("BEGIN PUBLIC KEY"));
//! ```

use chrono::{DateTime, Utc};
use restguard_core::environment::Clock;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use restguard_core::events::EventSink;
    use serde_json::Value as Json;
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use restguard_testing::mocks::FixedClock;
    /// use restguard_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Event sink that records every notification.
    ///
    /// Clones share the same log, so keep one handle and give the other to
    /// the code under test.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingSink {
        events: Arc<Mutex<Vec<(String, Json)>>>,
    }

    impl RecordingSink {
        /// Empty recorder.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Every `(name, payload)` received so far, in order.
        #[must_use]
        pub fn events(&self) -> Vec<(String, Json)> {
            self.events.lock().map(|events| events.clone()).unwrap_or_default()
        }

        /// Event names received so far, in order.
        #[must_use]
        pub fn names(&self) -> Vec<String> {
            self.events().into_iter().map(|(name, _)| name).collect()
        }
    }

    impl EventSink for RecordingSink {
        fn notify(&self, event: &str, payload: Json) {
            if let Ok(mut events) = self.events.lock() {
                events.push((event.to_owned(), payload));
            }
        }
    }
}

/// Signing fixtures.
///
/// Two RSA key pairs live in `fixtures/`: the session pair that verifiers in
/// tests trust, and a foreign pair for forging tokens with a valid shape but
/// the wrong signature.
pub mod tokens {
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use serde_json::{Map, Value as Json, json};

    /// Public half of the trusted session key (SPKI PEM).
    pub const SESSION_PUBLIC_PEM: &str = include_str!("../fixtures/session_public.pem");
    /// Private half of the trusted session key (PKCS#1 PEM).
    pub const SESSION_PRIVATE_PEM: &str = include_str!("../fixtures/session_private.pem");
    /// Public half of the untrusted key.
    pub const FOREIGN_PUBLIC_PEM: &str = include_str!("../fixtures/foreign_public.pem");
    /// Private half of the untrusted key.
    pub const FOREIGN_PRIVATE_PEM: &str = include_str!("../fixtures/foreign_private.pem");

    /// Builds signed session tokens.
    #[derive(Debug, Clone)]
    pub struct TokenBuilder {
        claims: Map<String, Json>,
        private_pem: &'static str,
        algorithm: Algorithm,
    }

    impl TokenBuilder {
        /// Token for session `session_id`, valid from the epoch for a year.
        #[must_use]
        pub fn new(session_id: impl Into<String>) -> Self {
            let mut claims = Map::new();
            claims.insert("sess".into(), Json::String(session_id.into()));
            claims.insert("iat".into(), json!(0));
            claims.insert("exp".into(), json!(365 * 24 * 3600));
            Self { claims, private_pem: SESSION_PRIVATE_PEM, algorithm: Algorithm::RS256 }
        }

        /// Attach `usr { id, nam }`.
        #[must_use]
        pub fn subject(mut self, id: impl Into<Json>, name: &str) -> Self {
            self.claims.insert("usr".into(), json!({ "id": id.into(), "nam": name }));
            self
        }

        /// Set `iat` and `exp` (seconds since the epoch).
        #[must_use]
        pub fn window(mut self, issued_at: i64, expires_at: i64) -> Self {
            self.claims.insert("iat".into(), json!(issued_at));
            self.claims.insert("exp".into(), json!(expires_at));
            self
        }

        /// Set or override any claim.
        #[must_use]
        pub fn claim(mut self, name: &str, value: impl Into<Json>) -> Self {
            self.claims.insert(name.into(), value.into());
            self
        }

        /// Remove a claim.
        #[must_use]
        pub fn without(mut self, name: &str) -> Self {
            self.claims.remove(name);
            self
        }

        /// Sign with the foreign key instead of the session key.
        #[must_use]
        pub const fn signed_by_foreign_key(mut self) -> Self {
            self.private_pem = FOREIGN_PRIVATE_PEM;
            self
        }

        /// Sign and encode.
        ///
        /// # Panics
        ///
        /// If the fixture keys fail to load, which means the fixtures are broken.
        #[must_use]
        #[allow(clippy::expect_used)]
        pub fn mint(self) -> String {
            let key = EncodingKey::from_rsa_pem(self.private_pem.as_bytes()).expect("fixture key should parse");
            jsonwebtoken::encode(&Header::new(self.algorithm), &Json::Object(self.claims), &key)
                .expect("fixture token should encode")
        }
    }

    /// Shorthand: session token for `session_id` valid over `[issued_at, expires_at)`.
    #[must_use]
    pub fn mint_session_token(session_id: &str, issued_at: i64, expires_at: i64) -> String {
        TokenBuilder::new(session_id).window(issued_at, expires_at).mint()
    }
}

/// Install a fmt subscriber honouring `RUST_LOG` (default `warn`).
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, RecordingSink, test_clock};
pub use tokens::{TokenBuilder, mint_session_token};
