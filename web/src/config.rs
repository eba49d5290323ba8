//! HTTP layer configuration.
//!
//! Owned by the host and passed explicitly to [`crate::Guards`] and
//! [`crate::Registry::build`]. Every field has a default, so a partial
//! config file deserializes fine.

use restguard_auth::SessionConfig;
use serde::Deserialize;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Largest request body buffered for body field checks.
    ///
    /// Default: 2 MiB
    pub body_limit: usize,

    /// Refuse to build a router when no module is registered.
    ///
    /// Default: false
    pub fail_without_routes: bool,

    /// Bearer session settings.
    pub session: SessionConfig,

    /// List endpoint settings.
    pub list: ListConfig,
}

impl ApiConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the body limit.
    #[must_use]
    pub const fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Set whether an empty registry is an error.
    #[must_use]
    pub const fn with_fail_without_routes(mut self, fail: bool) -> Self {
        self.fail_without_routes = fail;
        self
    }

    /// Replace the session settings.
    #[must_use]
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Replace the list settings.
    #[must_use]
    pub const fn with_list(mut self, list: ListConfig) -> Self {
        self.list = list;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            body_limit: 2 * 1024 * 1024,
            fail_without_routes: false,
            session: SessionConfig::default(),
            list: ListConfig::default(),
        }
    }
}

/// List endpoint configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Page size when the client sends no `limit`.
    ///
    /// Default: 10
    pub default_limit: u64,

    /// Upper bound for one fetch.
    ///
    /// Default: 30000 ms
    pub fetch_timeout_ms: u64,
}

impl ListConfig {
    /// Set the default page size.
    #[must_use]
    pub const fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit;
        self
    }

    /// Set the fetch timeout.
    #[must_use]
    pub const fn with_fetch_timeout_ms(mut self, millis: u64) -> Self {
        self.fetch_timeout_ms = millis;
        self
    }

    /// [`Self::fetch_timeout_ms`] as a `Duration`.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            fetch_timeout_ms: 30_000,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.body_limit, 2 * 1024 * 1024);
        assert!(!config.fail_without_routes);
        assert_eq!(config.list.default_limit, 10);
        assert_eq!(config.list.fetch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_nested_partial_config() {
        let config: ApiConfig = serde_json::from_str(
            r#"{ "fail_without_routes": true, "list": { "default_limit": 25 }, "session": { "realm": "api" } }"#,
        )
        .unwrap();
        assert!(config.fail_without_routes);
        assert_eq!(config.list.default_limit, 25);
        assert_eq!(config.list.fetch_timeout_ms, 30_000);
        assert_eq!(config.session.realm, "api");
        assert_eq!(config.session.verify_timeout_ms, 5000);
    }
}
