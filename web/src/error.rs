//! Error types for guards and handlers.
//!
//! Every rejection a guard produces is an [`AppError`]. It carries a
//! machine-readable code that ends up in the `X-Error` response header and
//! the JSON body, plus any challenge headers the client needs.

use crate::fields::Location;
use axum::{
    Json,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use restguard_core::ErrorKind;
use restguard_core::casing::to_upper_snake_case;
use serde::Serialize;
use std::fmt;

/// Header carrying the error code on every failed response.
pub const ERROR_HEADER: &str = "X-Error";

/// Fixed error codes.
pub mod codes {
    /// Body field checked but the request has no JSON body.
    pub const BODY_MISSING: &str = "ERR_BODY_MISSING";
    /// Body claims to be JSON but does not parse.
    pub const BODY_MALFORMED: &str = "ERR_BODY_MALFORMED";
    /// Body exceeds the configured limit.
    pub const BODY_TOO_LARGE: &str = "ERR_BODY_TOO_LARGE";
    /// Query string does not parse.
    pub const QUERY_MALFORMED: &str = "ERR_QUERY_MALFORMED";
    /// Neither `Origin` nor `Referer` present.
    pub const ORIGIN_MISSING: &str = "ERR_HEADER_ORIGIN_MISSING";
    /// `Origin`/`Referer` looks like a URL but is not one.
    pub const ORIGIN_NOURL: &str = "ERR_HEADER_ORIGIN_NOURL";
    /// No usable identity at the authentication gate.
    pub const UNAUTHENTICATED: &str = "ERR_UNAUTHENTICATED_ACCESS";
    /// Bearer token failed verification.
    pub const INVALID_TOKEN: &str = "ERR_INVALID_AUTHORIZATION_TOKEN";
    /// Bearer token verified but its session lapsed.
    pub const EXPIRED_TOKEN: &str = "ERR_EXPIRED_AUTHORIZATION_TOKEN";
    /// The verifier itself failed.
    pub const AUTHENTICATION_FAILED: &str = "ERR_AUTHENTICATION_FAILED";
    /// The list fetcher failed or timed out.
    pub const LIST_FETCH_FAILED: &str = "ERR_LIST_FETCH_FAILED";
    /// No route matched.
    pub const NOT_FOUND: &str = "ERR_NOT_FOUND";
    /// Anything else on our side.
    pub const INTERNAL: &str = "ERR_INTERNAL";
}

/// Non-standard status for a malformed origin URL.
pub const STATUS_ORIGIN_NOURL: u16 = 440;

/// `ERR_<LOCATION>_<FIELD>_<KIND>`, e.g. `ERR_BODY_TEST_FIELD_MISSING`.
#[must_use]
pub fn field_error_code(location: Location, field: &str, kind: ErrorKind) -> String {
    format!("ERR_{}_{}_{}", location.code_prefix(), to_upper_snake_case(field), kind)
}

/// Application error type for guards and handlers.
///
/// It implements Axum's `IntoResponse`, so handlers can return
/// `Result<_, AppError>` and guards short-circuit with it.
///
/// # Examples
///
/// ```
/// use axum::http::StatusCode;
/// use restguard_web::AppError;
///
/// let err = AppError::bad_request("ERR_BODY_NAME_TOOLONG", "name is too long");
/// assert_eq!(err.status(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.code(), "ERR_BODY_NAME_TOOLONG");
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error code (for client error handling)
    code: String,
    /// Error message (user-facing)
    message: String,
    /// Extra response headers, e.g. `WWW-Authenticate`
    headers: HeaderMap,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            headers: HeaderMap::new(),
            source: None,
        }
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Add a response header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    /// A field failed validation.
    #[must_use]
    pub fn invalid_field(location: Location, field: &str, kind: ErrorKind) -> Self {
        Self::bad_request(
            field_error_code(location, field, kind),
            format!("{location} '{field}' rejected: {kind}"),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL, message)
    }

    /// HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Extra response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        } else {
            tracing::debug!(status = %self.status, code = %self.code, "request rejected");
        }

        let mut headers = self.headers;
        if let Ok(value) = HeaderValue::from_str(&self.code) {
            headers.insert(ERROR_HEADER, value);
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, headers, Json(body)).into_response()
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}
