//! Per-request state shared by guards and handlers.
//!
//! A [`RequestContext`] is created lazily in the request extensions by the
//! first guard that needs it and dropped with the request. Guards write
//! validated values, the authenticated identity, the normalized origin, list
//! options and any pending authentication failure into it; handlers read it
//! back through the extractors in [`crate::extractors`].
//!
//! Sources are loaded on demand:
//!
//! - the query string is parsed once, on first use
//! - route parameters are read from the matched route
//! - the JSON body is buffered (up to the configured limit) only when a body
//!   field is checked, and put back so ordinary extractors still work

use crate::error::{AppError, codes};
use crate::list::ListOptions;
use crate::session::PendingFailure;
use axum::body::Body;
use axum::extract::{FromRequestParts, RawPathParams, Request};
use axum::http::{HeaderMap, StatusCode, header::CONTENT_LENGTH, header::CONTENT_TYPE};
use restguard_auth::SessionClaims;
use restguard_core::{Map, Value};

#[derive(Debug, Clone, Default)]
enum BodyState {
    #[default]
    Unread,
    Absent,
    Json(Value),
}

/// Validated request data and guard outcomes.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    body: BodyState,
    query: Option<Map>,
    params: Option<Map>,
    headers: Map,
    identity: Option<SessionClaims>,
    origin: Option<String>,
    list_options: Option<ListOptions>,
    pending: Option<PendingFailure>,
}

impl RequestContext {
    /// The parsed JSON body, if one was read and present.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        match &self.body {
            BodyState::Json(value) => Some(value),
            BodyState::Unread | BodyState::Absent => None,
        }
    }

    /// One body field.
    #[must_use]
    pub fn body_field(&self, name: &str) -> Option<&Value> {
        self.body().and_then(|body| body.get(name))
    }

    /// All query parameters, once parsed.
    #[must_use]
    pub const fn query(&self) -> Option<&Map> {
        self.query.as_ref()
    }

    /// One query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&Value> {
        self.query.as_ref().and_then(|query| query.get(name))
    }

    /// One route parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref().and_then(|params| params.get(name))
    }

    /// One validated header, by lower-case name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(&name.to_ascii_lowercase())
    }

    /// The authenticated session, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&SessionClaims> {
        self.identity.as_ref()
    }

    /// The normalized origin host, if checked and present.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Pagination set by the list endpoint.
    #[must_use]
    pub const fn list_options(&self) -> Option<&ListOptions> {
        self.list_options.as_ref()
    }

    /// Authentication failure recorded by a soft check and not yet raised.
    #[must_use]
    pub const fn pending_failure(&self) -> Option<&PendingFailure> {
        self.pending.as_ref()
    }

    pub(crate) const fn has_body(&self) -> bool {
        matches!(self.body, BodyState::Json(_))
    }

    pub(crate) fn set_body_field(&mut self, name: &str, value: Value) {
        if let BodyState::Json(Value::Object(map)) = &mut self.body {
            map.insert(name.to_owned(), value);
        }
    }

    pub(crate) fn set_query_param(&mut self, name: &str, value: Value) {
        self.query.get_or_insert_with(Map::new).insert(name.to_owned(), value);
    }

    pub(crate) fn set_param(&mut self, name: &str, value: Value) {
        self.params.get_or_insert_with(Map::new).insert(name.to_owned(), value);
    }

    pub(crate) fn set_header(&mut self, name: &str, value: Value) {
        self.headers.insert(name.to_ascii_lowercase(), value);
    }

    pub(crate) fn set_identity(&mut self, claims: SessionClaims) {
        self.identity = Some(claims);
        self.pending = None;
    }

    pub(crate) fn set_origin(&mut self, origin: String) {
        self.origin = Some(origin);
    }

    pub(crate) fn set_list_options(&mut self, options: ListOptions) {
        self.list_options = Some(options);
    }

    pub(crate) fn set_pending(&mut self, failure: PendingFailure) {
        self.pending = Some(failure);
    }

    pub(crate) fn take_pending(&mut self) -> Option<PendingFailure> {
        self.pending.take()
    }
}

/// The request's context, created on first access.
pub(crate) fn context_mut(req: &mut Request) -> &mut RequestContext {
    req.extensions_mut().get_or_insert_default::<RequestContext>()
}

/// Parse the query string into the context unless already done.
///
/// Repeated keys collect into an array.
pub(crate) fn load_query(req: &mut Request) -> Result<(), AppError> {
    if context_mut(req).query.is_some() {
        return Ok(());
    }
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(req.uri().query().unwrap_or_default())
        .map_err(|err| {
            AppError::bad_request(codes::QUERY_MALFORMED, "query string could not be parsed").with_source(err)
        })?;

    let mut query = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match query.remove(&key) {
            None => query.insert(key, value),
            Some(Value::Array(mut items)) => {
                items.push(value);
                query.insert(key, Value::Array(items))
            }
            Some(first) => query.insert(key, Value::Array(vec![first, value])),
        };
    }
    context_mut(req).query = Some(query);
    Ok(())
}

/// Copy the matched route parameters into the context unless already done.
///
/// Outside a route with parameters there are none, which is not an error.
pub(crate) async fn load_params(req: Request) -> Request {
    let (mut parts, body) = req.into_parts();
    let loaded = parts
        .extensions
        .get::<RequestContext>()
        .is_some_and(|ctx| ctx.params.is_some());
    if !loaded {
        let mut params = Map::new();
        if let Ok(raw) = RawPathParams::from_request_parts(&mut parts, &()).await {
            for (key, value) in &raw {
                params.insert(key.to_owned(), Value::from(value));
            }
        }
        parts.extensions.get_or_insert_default::<RequestContext>().params = Some(params);
    }
    Request::from_parts(parts, body)
}

/// Buffer and parse the JSON body into the context unless already done.
///
/// Requests without a body, or with a non-JSON content type, end up with no
/// body at all. The buffered bytes are put back into the request.
pub(crate) async fn load_body(mut req: Request, limit: usize) -> Result<Request, AppError> {
    if !matches!(context_mut(&mut req).body, BodyState::Unread) {
        return Ok(req);
    }

    if declared_length(req.headers()).is_some_and(|length| length > limit) {
        return Err(too_large(limit));
    }

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|err| too_large(limit).with_source(err))?;

    let state = if bytes.is_empty() || !is_json(&parts.headers) {
        BodyState::Absent
    } else {
        let json: serde_json::Value = serde_json::from_slice(&bytes).map_err(|err| {
            AppError::bad_request(codes::BODY_MALFORMED, "request body is not valid JSON").with_source(err)
        })?;
        BodyState::Json(Value::from(json))
    };

    let mut req = Request::from_parts(parts, Body::from(bytes));
    context_mut(&mut req).body = state;
    Ok(req)
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.parse().ok()
}

/// `application/json`, `application/*+json`, or no content type at all.
fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE) else {
        return true;
    };
    let Ok(content_type) = content_type.to_str() else {
        return false;
    };
    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn too_large(limit: usize) -> AppError {
    AppError::new(
        StatusCode::PAYLOAD_TOO_LARGE,
        codes::BODY_TOO_LARGE,
        format!("request body exceeds {limit} bytes"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(uri: &str, content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = Request::builder().uri(uri).method("POST");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[test]
    fn test_query_repeated_keys_become_arrays() {
        let mut req = request("/?a=1&b=x&a=2&a=3", None, "");
        load_query(&mut req).unwrap();
        let ctx = context_mut(&mut req);
        assert_eq!(ctx.query_param("b"), Some(&Value::from("x")));
        assert_eq!(ctx.query_param("a"), Some(&Value::from(json!(["1", "2", "3"]))));
        assert_eq!(ctx.query_param("c"), None);
    }

    #[test]
    fn test_query_is_parsed_once() {
        let mut req = request("/?a=1", None, "");
        load_query(&mut req).unwrap();
        context_mut(&mut req).set_query_param("a", Value::from(1));
        load_query(&mut req).unwrap();
        assert_eq!(context_mut(&mut req).query_param("a"), Some(&Value::from(1)));
    }

    #[tokio::test]
    async fn test_json_body_is_parsed_and_restored() {
        let req = request("/", Some("application/json"), r#"{"name":"x"}"#);
        let mut req = load_body(req, 1024).await.unwrap();
        assert_eq!(context_mut(&mut req).body_field("name"), Some(&Value::from("x")));

        let bytes = axum::body::to_bytes(req.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], br#"{"name":"x"}"#);
    }

    #[tokio::test]
    async fn test_empty_or_foreign_body_is_absent() {
        let mut req = load_body(request("/", Some("application/json"), ""), 1024).await.unwrap();
        assert!(!context_mut(&mut req).has_body());

        let mut req = load_body(request("/", Some("text/plain"), "{}"), 1024).await.unwrap();
        assert!(!context_mut(&mut req).has_body());
    }

    #[tokio::test]
    async fn test_vendor_json_is_json() {
        let mut req = load_body(request("/", Some("application/vnd.api+json; charset=utf-8"), "{}"), 1024)
            .await
            .unwrap();
        assert!(context_mut(&mut req).has_body());
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let err = load_body(request("/", Some("application/json"), "{oops"), 1024).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), codes::BODY_MALFORMED);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let err = load_body(request("/", Some("application/json"), r#"{"a":"0123456789"}"#), 8)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.code(), codes::BODY_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_params_outside_a_route_are_empty() {
        let mut req = load_params(request("/x", None, "")).await;
        let ctx = context_mut(&mut req);
        assert!(ctx.params.as_ref().is_some_and(Map::is_empty));
    }
}
