//! Axum extractors for handlers behind guards.
//!
//! - [`RequestContext`]: everything the guards validated
//! - [`ValidatedJson`]: the (possibly rewritten) JSON body as a typed value
//! - [`Authenticated`]: the verified session, rejecting with 401 if none
//! - [`RequestOrigin`]: the normalized origin host, if checked
//! - [`ClientIp`]: best-effort client address
//!
//! # Example
//!
//! ```ignore
//! async fn create_user(
//!     Authenticated(session): Authenticated,
//!     ValidatedJson(user): ValidatedJson<NewUser>,
//! ) -> Result<Json<User>, AppError> {
//!     tracing::info!(session_id = %session.session_id, "creating user");
//!     Ok(Json(repo.insert(user).await?))
//! }
//! ```

use crate::context::RequestContext;
use crate::error::{AppError, codes};
use crate::session::PendingFailure;
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::rejection::BytesRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::{HeaderMap, StatusCode};
use axum::http::request::Parts;
use restguard_auth::{DEFAULT_REALM, SessionClaims};
use serde::de::DeserializeOwned;
use std::net::{IpAddr, SocketAddr};

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_default())
    }
}

/// The JSON body as guards left it, deserialized into `T`.
///
/// Reads the context when a body guard already parsed the body, so rewritten
/// fields are seen. Otherwise parses the raw body, buffered within the
/// route's [`DefaultBodyLimit`](axum::extract::DefaultBodyLimit). The
/// [`crate::Registry`] sets that limit to `ApiConfig::body_limit`.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let parsed = req
            .extensions()
            .get::<RequestContext>()
            .and_then(RequestContext::body)
            .map(restguard_core::Value::to_json);

        let json = if let Some(json) = parsed {
            json
        } else {
            let bytes = Bytes::from_request(req, state).await.map_err(unreadable)?;
            if bytes.is_empty() {
                return Err(AppError::bad_request(codes::BODY_MISSING, "request has no JSON body"));
            }
            serde_json::from_slice(&bytes).map_err(malformed)?
        };

        serde_json::from_value(json).map(Self).map_err(malformed)
    }
}

fn unreadable(rejection: BytesRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(StatusCode::PAYLOAD_TOO_LARGE, codes::BODY_TOO_LARGE, "request body exceeds the body limit")
            .with_source(rejection)
    } else {
        AppError::bad_request(codes::BODY_MISSING, "request body unreadable").with_source(rejection)
    }
}

fn malformed(err: serde_json::Error) -> AppError {
    AppError::bad_request(codes::BODY_MALFORMED, format!("request body does not match: {err}")).with_source(err)
}

/// The verified session.
///
/// Rejects like the authentication gate when no session check attached an
/// identity: with the recorded failure if there is one, otherwise 401.
#[derive(Debug, Clone)]
pub struct Authenticated(pub SessionClaims);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<RequestContext>();
        if let Some(claims) = ctx.and_then(RequestContext::identity) {
            return Ok(Self(claims.clone()));
        }
        let failure = ctx
            .and_then(RequestContext::pending_failure)
            .cloned()
            .unwrap_or_else(|| PendingFailure::unauthenticated(format!("Bearer realm=\"{DEFAULT_REALM}\"")));
        Err(failure.into_error())
    }
}

/// Origin host stored by the origin guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<RequestContext>()
                .and_then(RequestContext::origin)
                .map(str::to_owned),
        ))
    }
}

/// Client IP address.
///
/// # Priority
///
/// 1. `X-Forwarded-For` (first IP in the list)
/// 2. `X-Real-IP`
/// 3. Connection address, when the server was started with connect info
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(client_ip(&parts.headers, parts.extensions.get())))
    }
}

pub(crate) fn client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> Option<IpAddr> {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|list| list.split(',').next())
        .and_then(|first| first.trim().parse().ok());

    forwarded
        .or_else(|| headers.get("X-Real-IP").and_then(|v| v.to_str().ok()).and_then(|ip| ip.trim().parse().ok()))
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip()))
}
