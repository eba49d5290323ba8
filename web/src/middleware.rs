//! Request tracking and access logging.
//!
//! [`request_id_layer`] wraps the whole router:
//!
//! 1. **Assign** a short request id and store it in request extensions
//! 2. **Span** the request with method, uri and request id
//! 3. **Echo** the id in the `X-Request-Id` response header
//! 4. **Log** one access line per response, including the `X-Error` code
//!    and, when a session check succeeded, the session id
//!
//! # Example
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/api/users", get(list_users))
//!     .layer(request_id_layer());
//! ```

use crate::error::ERROR_HEADER;
use crate::extractors::client_ip;
use axum::async_trait;
use axum::extract::{FromRequestParts, Request};
use axum::extract::connect_info::ConnectInfo;
use axum::http::HeaderValue;
use axum::http::request::Parts;
use axum::response::Response;
use futures::future::BoxFuture;
use std::fmt;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Short id assigned to each request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// A fresh id: 8 upper-case hex digits.
    #[must_use]
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..8].to_ascii_uppercase())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(Self::generate))
    }
}

/// Response extension naming the session a request was served for.
///
/// Set by guard layers after a successful session check, read by the access
/// log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession(pub String);

/// Create the request id and access log layer.
#[must_use]
pub fn request_id_layer() -> RequestIdLayer {
    RequestIdLayer
}

/// Layer for request id tracking.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdMiddleware { inner }
    }
}

/// Middleware service for request id tracking.
#[derive(Clone, Debug)]
pub struct RequestIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for RequestIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let request_id = RequestId::generate();
        req.extensions_mut().insert(request_id.clone());

        let method = req.method().clone();
        let uri = req.uri().clone();
        let client = client_ip(req.headers(), req.extensions().get::<ConnectInfo<SocketAddr>>());

        let span = tracing::info_span!(
            "http_request",
            request_id = %request_id,
            method = %method,
            uri = %uri,
        );

        let started = Instant::now();
        let fut = self.inner.call(req);

        Box::pin(
            async move {
                let mut response = fut.await?;

                let error = response
                    .headers()
                    .get(ERROR_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-")
                    .to_owned();
                let session = response.extensions().get::<AuthenticatedSession>().map_or("-", |s| s.0.as_str());
                tracing::info!(
                    status = response.status().as_u16(),
                    error = %error,
                    client_ip = %client.map_or_else(|| "-".to_owned(), |ip| ip.to_string()),
                    session_id = %session,
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "{method} {uri}"
                );

                if let Ok(value) = HeaderValue::from_str(&request_id.0) {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}
