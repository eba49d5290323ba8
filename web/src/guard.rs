//! The guard abstraction and its tower layer.
//!
//! A [`Guard`] inspects a request before the handler sees it and either
//! admits it (possibly after rewriting it) or rejects it with an
//! [`AppError`]. [`GuardLayer`] runs one guard in front of any service.
//!
//! # Ordering
//!
//! Guards run in the order they wrap the service. With
//! [`tower::ServiceBuilder`] that is the order they are listed:
//!
//! ```ignore
//! let route = get(handler).route_layer(
//!     ServiceBuilder::new()
//!         .layer(guards.check_session_token(verifier))
//!         .layer(guards.requires_authentication())
//!         .layer(guards.check_query_parameter("q", Rules::new().not_blank(), FieldOptions::optional())),
//! );
//! ```
//!
//! The first rejection short-circuits everything after it.

use crate::context::RequestContext;
use crate::error::AppError;
use crate::middleware::AuthenticatedSession;
use axum::extract::Request;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Outcome of a successful inspection.
#[derive(Debug)]
pub struct Admitted {
    /// The request to hand on.
    pub request: Request,
    /// Headers to add to the eventual response.
    pub headers: HeaderMap,
}

impl Admitted {
    /// Hand the request on unchanged, adding no headers.
    #[must_use]
    pub fn new(request: Request) -> Self {
        Self { request, headers: HeaderMap::new() }
    }

    /// Hand the request on and add `headers` to the response.
    #[must_use]
    pub const fn with_headers(request: Request, headers: HeaderMap) -> Self {
        Self { request, headers }
    }
}

/// Request inspection run ahead of a handler.
pub trait Guard: Send + Sync + 'static {
    /// Admit or reject `request`.
    ///
    /// # Errors
    ///
    /// The rejection to send instead of running the handler.
    fn inspect(&self, request: Request) -> BoxFuture<'_, Result<Admitted, AppError>>;
}

/// Layer running a [`Guard`].
pub struct GuardLayer<G> {
    guard: Arc<G>,
}

impl<G> GuardLayer<G> {
    /// Wrap `guard`.
    #[must_use]
    pub fn new(guard: G) -> Self {
        Self { guard: Arc::new(guard) }
    }

    /// The wrapped guard.
    #[must_use]
    pub fn guard(&self) -> &G {
        &self.guard
    }
}

impl<G> Clone for GuardLayer<G> {
    fn clone(&self) -> Self {
        Self { guard: Arc::clone(&self.guard) }
    }
}

impl<G: std::fmt::Debug> std::fmt::Debug for GuardLayer<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardLayer").field("guard", &self.guard).finish()
    }
}

impl<S, G> Layer<S> for GuardLayer<G> {
    type Service = GuardService<S, G>;

    fn layer(&self, inner: S) -> Self::Service {
        GuardService { inner, guard: Arc::clone(&self.guard) }
    }
}

/// Middleware service produced by [`GuardLayer`].
pub struct GuardService<S, G> {
    inner: S,
    guard: Arc<G>,
}

impl<S: Clone, G> Clone for GuardService<S, G> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), guard: Arc::clone(&self.guard) }
    }
}

impl<S, G> Service<Request> for GuardService<S, G>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    G: Guard,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let guard = Arc::clone(&self.guard);
        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let admitted = match guard.inspect(request).await {
                Ok(admitted) => admitted,
                Err(err) => {
                    metrics::counter!("guard.rejections", "code" => err.code().to_owned()).increment(1);
                    return Ok(err.into_response());
                }
            };

            let session = admitted
                .request
                .extensions()
                .get::<RequestContext>()
                .and_then(RequestContext::identity)
                .map(|claims| AuthenticatedSession(claims.session_id.clone()));

            let mut response = inner.call(admitted.request).await?;
            for (name, value) in &admitted.headers {
                response.headers_mut().append(name, value.clone());
            }
            if let Some(session) = session {
                response.extensions_mut().insert(session);
            }
            Ok(response)
        })
    }
}
