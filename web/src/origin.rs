//! Origin header guard.
//!
//! Reads `Origin`, falling back to `Referer`, and stores the bare host name in
//! the request context. Absolute URLs are reduced to their host; anything
//! else passes through as-is.

use crate::context;
use crate::error::{AppError, STATUS_ORIGIN_NOURL, codes};
use crate::fields::FieldOptions;
use crate::guard::{Admitted, Guard};
use axum::extract::Request;
use axum::http::header::{ORIGIN, REFERER};
use axum::http::{HeaderMap, StatusCode, Uri};
use futures::future::BoxFuture;

/// Guard normalizing the request origin. Build it through [`crate::Guards`].
#[derive(Debug, Clone, Copy)]
pub struct OriginGuard {
    optional: bool,
}

impl OriginGuard {
    pub(crate) const fn new(options: FieldOptions) -> Self {
        Self { optional: options.optional }
    }
}

impl Guard for OriginGuard {
    fn inspect(&self, mut request: Request) -> BoxFuture<'_, Result<Admitted, AppError>> {
        Box::pin(async move {
            match normalize_origin(request.headers())? {
                Some(origin) => context::context_mut(&mut request).set_origin(origin),
                None if self.optional => {}
                None => {
                    return Err(AppError::bad_request(
                        codes::ORIGIN_MISSING,
                        "neither Origin nor Referer header present",
                    ));
                }
            }
            Ok(Admitted::new(request))
        })
    }
}

/// The origin host named by `Origin` or `Referer`, if either is present.
///
/// # Errors
///
/// 440 `ERR_HEADER_ORIGIN_NOURL` when the value looks like a URL but does
/// not parse as one or names no host.
pub fn normalize_origin(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let raw = [ORIGIN, REFERER]
        .iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty());

    let Some(raw) = raw else {
        return Ok(None);
    };
    if !raw.contains("://") {
        return Ok(Some(raw.to_owned()));
    }

    raw.parse::<Uri>()
        .ok()
        .and_then(|uri| uri.host().map(str::to_owned))
        .filter(|host| !host.is_empty())
        .map(Some)
        .ok_or_else(|| {
            let status = StatusCode::from_u16(STATUS_ORIGIN_NOURL).unwrap_or(StatusCode::BAD_REQUEST);
            AppError::new(status, codes::ORIGIN_NOURL, format!("origin '{raw}' is not a valid URL"))
        })
}
