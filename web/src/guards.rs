//! Guard factory bound to one [`ApiConfig`].
//!
//! Every guard constructor in the crate goes through [`Guards`], so body
//! limits, session settings and the event sink are configured once and shared
//! by all routes of an API. Modules receive it from the [`crate::Registry`].

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::fields::{FieldGuard, FieldOptions, Location};
use crate::guard::GuardLayer;
use crate::list::{ListEndpoint, ListOptions};
use crate::origin::OriginGuard;
use crate::session::{AuthenticationGate, SessionAuthenticator};
use axum::extract::{DefaultBodyLimit, Request};
use restguard_auth::SessionVerifier;
use restguard_core::Predicate;
use restguard_core::events::EventSink;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Builds guard layers and list endpoints.
#[derive(Clone)]
pub struct Guards {
    config: Arc<ApiConfig>,
    events: Option<Arc<dyn EventSink>>,
}

impl Guards {
    /// Guards for `config`.
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self { config: Arc::new(config), events: None }
    }

    /// Report session outcomes to `sink`.
    #[must_use]
    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Body limit for extractors that buffer the body themselves, such as
    /// [`crate::ValidatedJson`] on routes without a body guard.
    #[must_use]
    pub fn body_limit(&self) -> DefaultBodyLimit {
        DefaultBodyLimit::max(self.config.body_limit)
    }

    fn field(&self, location: Location, name: &str, predicate: impl Predicate, options: FieldOptions) -> GuardLayer<FieldGuard> {
        GuardLayer::new(FieldGuard::new(location, name, predicate, options, self.config.body_limit))
    }

    /// Validate a top-level field of the JSON body.
    #[must_use]
    pub fn check_body_field(&self, name: &str, predicate: impl Predicate, options: FieldOptions) -> GuardLayer<FieldGuard> {
        self.field(Location::Body, name, predicate, options)
    }

    /// Validate a query string parameter.
    #[must_use]
    pub fn check_query_parameter(
        &self,
        name: &str,
        predicate: impl Predicate,
        options: FieldOptions,
    ) -> GuardLayer<FieldGuard> {
        self.field(Location::Query, name, predicate, options)
    }

    /// Validate a request header. Names are case-insensitive.
    #[must_use]
    pub fn check_request_header(
        &self,
        name: &str,
        predicate: impl Predicate,
        options: FieldOptions,
    ) -> GuardLayer<FieldGuard> {
        self.field(Location::Header, name, predicate, options)
    }

    /// Validate a route parameter. Route parameters are always required.
    #[must_use]
    pub fn check_request_parameter(&self, name: &str, predicate: impl Predicate) -> GuardLayer<FieldGuard> {
        self.field(Location::Param, name, predicate, FieldOptions::required())
    }

    /// Normalize `Origin`/`Referer` into the request context.
    #[must_use]
    pub fn check_origin_header(&self, options: FieldOptions) -> GuardLayer<OriginGuard> {
        GuardLayer::new(OriginGuard::new(options))
    }

    fn configured<V: SessionVerifier>(&self, verifier: V) -> Arc<V> {
        Arc::new(verifier.with_config(&self.config.session))
    }

    /// Soft session check: attach the identity or record why not.
    ///
    /// Pair it with [`Guards::requires_authentication`].
    #[must_use]
    pub fn check_session_token<V: SessionVerifier + 'static>(
        &self,
        verifier: V,
    ) -> GuardLayer<SessionAuthenticator<V>> {
        GuardLayer::new(
            SessionAuthenticator::soft(self.configured(verifier), self.config.session.clone()).with_events(self.events.clone()),
        )
    }

    /// Session check that rejects immediately on failure.
    #[must_use]
    pub fn require_session_token<V: SessionVerifier + 'static>(
        &self,
        verifier: V,
    ) -> GuardLayer<SessionAuthenticator<V>> {
        GuardLayer::new(
            SessionAuthenticator::fail_fast(self.configured(verifier), self.config.session.clone())
                .with_events(self.events.clone()),
        )
    }

    /// Reject unless an earlier session check attached an identity.
    #[must_use]
    pub fn requires_authentication(&self) -> GuardLayer<AuthenticationGate> {
        GuardLayer::new(AuthenticationGate::new(&self.config.session))
    }

    /// Route service answering with a page of what `fetch` returns.
    ///
    /// `fetch` receives the validated [`ListOptions`] and the request (with
    /// its context). `Ok(None)` is answered as an empty list.
    #[must_use]
    pub fn list_endpoint<F, Fut, T>(&self, fetch: F) -> ListEndpoint<F>
    where
        F: Fn(ListOptions, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Vec<T>>, AppError>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        ListEndpoint::new(fetch, self.config.list)
    }
}

impl fmt::Debug for Guards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guards")
            .field("config", &self.config)
            .field("events", &self.events.is_some())
            .finish()
    }
}
