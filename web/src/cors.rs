//! Cross-origin policy.
//!
//! Any origin may call the API. The custom response headers are exposed so
//! browser clients can read error codes, request ids and pagination.

use crate::error::ERROR_HEADER;
use crate::list::{LIST_COUNT_HEADER, LIST_ORDER_HEADER, LIST_PAGE_SIZE_HEADER, LIST_POS_HEADER};
use crate::middleware::REQUEST_ID_HEADER;
use axum::http::HeaderName;
use axum::http::header::WWW_AUTHENTICATE;
use tower_http::cors::{Any, CorsLayer};

/// Headers readable by cross-origin clients.
#[must_use]
pub fn exposed_headers() -> Vec<HeaderName> {
    [ERROR_HEADER, REQUEST_ID_HEADER, LIST_COUNT_HEADER, LIST_POS_HEADER, LIST_PAGE_SIZE_HEADER, LIST_ORDER_HEADER]
        .into_iter()
        .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
        .chain(std::iter::once(WWW_AUTHENTICATE))
        .collect()
}

/// Permissive CORS layer exposing [`exposed_headers`].
#[must_use]
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(exposed_headers())
}
