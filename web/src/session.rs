//! Bearer session authentication.
//!
//! Two phases, so several authenticators can be tried before one gate
//! decides:
//!
//! - **Soft check** ([`SessionAuthenticator::soft`]): evaluate the
//!   `Authorization` header. Success attaches the identity. Failure is
//!   recorded in the context as a [`PendingFailure`] and the request moves on.
//! - **Gate** ([`AuthenticationGate`]): reject unless an identity is
//!   attached, using the pending failure if there is one.
//!
//! [`SessionAuthenticator::fail_fast`] collapses both into one step.
//!
//! | token state | status | code |
//! |---|---|---|
//! | no header, not `Bearer <token>`, blank token | 401 + challenge | `ERR_UNAUTHENTICATED_ACCESS` |
//! | bad signature or unreadable | 403 | `ERR_INVALID_AUTHORIZATION_TOKEN` |
//! | expired | 410 | `ERR_EXPIRED_AUTHORIZATION_TOKEN` |
//! | verifier fault or timeout | 500 | `ERR_AUTHENTICATION_FAILED` |

use crate::context::{self, RequestContext};
use crate::error::{AppError, codes};
use crate::guard::{Admitted, Guard};
use axum::extract::Request;
use axum::http::header::{AUTHORIZATION, VARY, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use futures::future::BoxFuture;
use restguard_auth::{SessionClaims, SessionConfig, SessionError, SessionVerifier};
use restguard_core::events::EventSink;
use serde_json::json;
use std::fmt;
use std::sync::Arc;

/// An authentication failure recorded but not yet raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFailure {
    /// Status the gate will respond with.
    pub status: StatusCode,
    /// Error code the gate will respond with.
    pub code: &'static str,
    /// `WWW-Authenticate` value, for 401s.
    pub challenge: Option<String>,
}

impl PendingFailure {
    /// 401 with a challenge.
    #[must_use]
    pub const fn unauthenticated(challenge: String) -> Self {
        Self { status: StatusCode::UNAUTHORIZED, code: codes::UNAUTHENTICATED, challenge: Some(challenge) }
    }

    /// 403, the token was refused.
    #[must_use]
    pub const fn invalid() -> Self {
        Self { status: StatusCode::FORBIDDEN, code: codes::INVALID_TOKEN, challenge: None }
    }

    /// 410, the session lapsed.
    #[must_use]
    pub const fn expired() -> Self {
        Self { status: StatusCode::GONE, code: codes::EXPIRED_TOKEN, challenge: None }
    }

    /// Raise it.
    #[must_use]
    pub fn into_error(self) -> AppError {
        let message = match self.status {
            StatusCode::FORBIDDEN => "invalid authorization token",
            StatusCode::GONE => "authorization token has expired",
            _ => "authentication required",
        };
        let mut err = AppError::new(self.status, self.code, message);
        if let Some(value) = self.challenge.and_then(|c| HeaderValue::from_str(&c).ok()) {
            err = err.with_header(WWW_AUTHENTICATE, value);
        }
        err
    }
}

/// How the `Authorization` header was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState<'a> {
    /// No `Authorization` header.
    NoHeader,
    /// Present but not `Bearer <token>`.
    Malformed,
    /// `Bearer` with nothing after it.
    MissingToken,
    /// A token to verify.
    Present(&'a str),
}

/// Classify the `Authorization` header. The scheme is case-insensitive.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> TokenState<'_> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return TokenState::NoHeader;
    };
    let Ok(value) = value.to_str() else {
        return TokenState::Malformed;
    };
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), token, None) if scheme.eq_ignore_ascii_case("bearer") => {
            token.map_or(TokenState::MissingToken, TokenState::Present)
        }
        _ => TokenState::Malformed,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Soft,
    FailFast,
}

/// Guard verifying bearer session tokens. Build it through [`crate::Guards`].
pub struct SessionAuthenticator<V> {
    verifier: Arc<V>,
    config: SessionConfig,
    events: Option<Arc<dyn EventSink>>,
    mode: Mode,
}

impl<V: SessionVerifier + 'static> SessionAuthenticator<V> {
    /// Record failures and let the request continue.
    #[must_use]
    pub fn soft(verifier: Arc<V>, config: SessionConfig) -> Self {
        Self { verifier, config, events: None, mode: Mode::Soft }
    }

    /// Reject on any failure.
    #[must_use]
    pub fn fail_fast(verifier: Arc<V>, config: SessionConfig) -> Self {
        Self { verifier, config, events: None, mode: Mode::FailFast }
    }

    /// Report outcomes to `events`.
    #[must_use]
    pub fn with_events(mut self, events: Option<Arc<dyn EventSink>>) -> Self {
        self.events = events;
        self
    }

    /// Evaluate `headers` to an identity or a failure.
    ///
    /// # Errors
    ///
    /// `Ok(Err(pending))` for client-side failures, `Err` for server faults.
    pub async fn evaluate(&self, headers: &HeaderMap) -> Result<Result<SessionClaims, PendingFailure>, AppError> {
        let token = match bearer_token(headers) {
            TokenState::Present(token) => token,
            TokenState::NoHeader | TokenState::Malformed | TokenState::MissingToken => {
                return Ok(Err(PendingFailure::unauthenticated(self.config.challenge())));
            }
        };

        let verified = tokio::time::timeout(self.config.verify_timeout(), self.verifier.verify(token))
            .await
            .unwrap_or(Err(SessionError::Timeout));

        let (outcome, result) = match verified {
            Ok(claims) => ("authenticated", Ok(Ok(claims))),
            Err(SessionError::Invalid { .. }) => ("invalid", Ok(Err(PendingFailure::invalid()))),
            Err(SessionError::Expired) => ("expired", Ok(Err(PendingFailure::expired()))),
            Err(err) => (
                "error",
                Err(AppError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::AUTHENTICATION_FAILED,
                    "session verification failed",
                )
                .with_source(err)),
            ),
        };
        metrics::counter!("session.verifications", "outcome" => outcome).increment(1);
        result
    }

    fn notify(&self, event: &str, payload: serde_json::Value) {
        if let Some(events) = &self.events {
            events.notify(event, payload);
        }
    }

    async fn run(&self, mut request: Request) -> Result<Admitted, AppError> {
        if context::context_mut(&mut request).identity().is_some() {
            return Ok(Admitted::new(request));
        }

        let evaluated = self.evaluate(request.headers()).await?;
        match evaluated {
            Ok(claims) => {
                tracing::debug!(session_id = %claims.session_id, "session authenticated");
                self.notify(
                    "session.authenticated",
                    json!({
                        "sessionId": &claims.session_id,
                        "subjectId": &claims.subject_id,
                        "subjectName": &claims.subject_name,
                    }),
                );
                context::context_mut(&mut request).set_identity(claims);
                let mut headers = HeaderMap::new();
                headers.insert(VARY, HeaderValue::from_static("Authorization"));
                Ok(Admitted::with_headers(request, headers))
            }
            Err(failure) => {
                if failure.status != StatusCode::UNAUTHORIZED {
                    self.notify(
                        "session.rejected",
                        json!({ "status": failure.status.as_u16(), "code": failure.code }),
                    );
                }
                match self.mode {
                    Mode::FailFast => Err(failure.into_error()),
                    Mode::Soft => {
                        context::context_mut(&mut request).set_pending(failure);
                        Ok(Admitted::new(request))
                    }
                }
            }
        }
    }
}

impl<V: SessionVerifier + 'static> Guard for SessionAuthenticator<V> {
    fn inspect(&self, request: Request) -> BoxFuture<'_, Result<Admitted, AppError>> {
        Box::pin(self.run(request))
    }
}

impl<V> fmt::Debug for SessionAuthenticator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionAuthenticator")
            .field("mode", &self.mode)
            .field("realm", &self.config.realm)
            .finish_non_exhaustive()
    }
}

/// Hard gate: reject unless an earlier guard attached an identity.
#[derive(Debug, Clone)]
pub struct AuthenticationGate {
    challenge: String,
}

impl AuthenticationGate {
    pub(crate) fn new(config: &SessionConfig) -> Self {
        Self { challenge: config.challenge() }
    }

    fn decide(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        if ctx.identity().is_some() {
            return Ok(());
        }
        let failure = ctx
            .take_pending()
            .unwrap_or_else(|| PendingFailure::unauthenticated(self.challenge.clone()));
        Err(failure.into_error())
    }
}

impl Guard for AuthenticationGate {
    fn inspect(&self, mut request: Request) -> BoxFuture<'_, Result<Admitted, AppError>> {
        let decision = self.decide(context::context_mut(&mut request));
        Box::pin(async move { decision.map(|()| Admitted::new(request)) })
    }
}
