//! Paginated list endpoints.
//!
//! [`ListEndpoint`] wraps a caller-supplied fetcher into a complete route
//! service:
//!
//! 1. validate `pos`, `limit`, `order-by` and `order-dir` from the query
//! 2. call the fetcher with the resulting [`ListOptions`] (bounded by a timeout)
//! 3. respond 200 with the serialized items and pagination headers
//!
//! | header | value |
//! |---|---|
//! | `X-List-Count` | number of items returned |
//! | `X-List-Pos` | effective `pos` |
//! | `X-List-Page-Size` | effective `limit` |
//! | `X-List-Order` | `<field>;<asc\|desc>`, only when `order-by` is set |
//!
//! # Example
//!
//! ```ignore
//! let users = guards.list_endpoint(|options: ListOptions, _req| async move {
//!     Ok(Some(repo.page(options.pos, options.limit).await?))
//! });
//! let app = Router::new().route_service("/users", users);
//! ```

use crate::config::ListConfig;
use crate::context;
use crate::error::{AppError, codes};
use crate::fields::Location;
use axum::Json;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use restguard_core::checks::{self, CastTarget};
use restguard_core::{ErrorKind, Map, Value, serializer};
use serde::Serialize;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// Count of items in the response.
pub const LIST_COUNT_HEADER: &str = "X-List-Count";
/// Effective offset.
pub const LIST_POS_HEADER: &str = "X-List-Pos";
/// Effective page size.
pub const LIST_PAGE_SIZE_HEADER: &str = "X-List-Page-Size";
/// Effective ordering.
pub const LIST_ORDER_HEADER: &str = "X-List-Order";

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl OrderDirection {
    /// `asc` or `desc`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated pagination and ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListOptions {
    /// Offset of the first item.
    pub pos: u64,
    /// Page size.
    pub limit: u64,
    /// Field to order by, if any.
    pub order_by: Option<String>,
    /// Direction of the ordering.
    pub order_direction: OrderDirection,
}

impl ListOptions {
    /// Read the options from parsed query parameters.
    ///
    /// # Errors
    ///
    /// 400 `ERR_QUERY_<PARAM>_INVALID` for negative or non-numeric `pos` or
    /// `limit`, a non-string `order-by`, or an `order-dir` other than
    /// `asc`/`desc`.
    pub fn from_query(query: &Map, default_limit: u64) -> Result<Self, AppError> {
        let pos = non_negative(query, "pos")?.unwrap_or(0);
        let limit = non_negative(query, "limit")?.unwrap_or(default_limit);

        let order_by = text(query, "order-by")?.filter(|field| !field.is_empty());

        let order_direction = match text(query, "order-dir")?.map(|dir| dir.to_ascii_lowercase()).as_deref() {
            None | Some("" | "asc") => OrderDirection::Asc,
            Some("desc") => OrderDirection::Desc,
            Some(_) => return Err(invalid("order-dir")),
        };

        Ok(Self { pos, limit, order_by, order_direction })
    }

    /// `X-List-Order` value, when ordering was requested.
    #[must_use]
    pub fn order_header(&self) -> Option<String> {
        self.order_by.as_ref().map(|field| format!("{field};{}", self.order_direction))
    }
}

fn invalid(param: &str) -> AppError {
    AppError::invalid_field(Location::Query, param, ErrorKind::Invalid)
}

fn present<'a>(query: &'a Map, param: &str) -> Option<&'a Value> {
    query.get(param).filter(|value| !value.is_missing())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn non_negative(query: &Map, param: &str) -> Result<Option<u64>, AppError> {
    let Some(value) = present(query, param) else {
        return Ok(None);
    };
    let number = checks::cast(CastTarget::Integer, value.clone())
        .ok()
        .and_then(|v| v.as_f64())
        .ok_or_else(|| invalid(param))?;
    if number < 0.0 {
        return Err(invalid(param));
    }
    Ok(Some(number as u64))
}

fn text(query: &Map, param: &str) -> Result<Option<String>, AppError> {
    let Some(value) = present(query, param) else {
        return Ok(None);
    };
    checks::cast(CastTarget::String, value.clone())
        .ok()
        .and_then(|v| v.as_str().map(|s| s.trim().to_owned()))
        .map(Some)
        .ok_or_else(|| invalid(param))
}

/// Route service answering with one page of items. Build it through
/// [`crate::Guards::list_endpoint`].
pub struct ListEndpoint<F> {
    fetch: Arc<F>,
    config: ListConfig,
}

impl<F> ListEndpoint<F> {
    /// Wrap `fetch`.
    #[must_use]
    pub fn new(fetch: F, config: ListConfig) -> Self {
        Self { fetch: Arc::new(fetch), config }
    }
}

impl<F> Clone for ListEndpoint<F> {
    fn clone(&self) -> Self {
        Self { fetch: Arc::clone(&self.fetch), config: self.config }
    }
}

impl<F> fmt::Debug for ListEndpoint<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListEndpoint").field("config", &self.config).finish_non_exhaustive()
    }
}

impl<F, Fut, T> Service<Request> for ListEndpoint<F>
where
    F: Fn(ListOptions, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Vec<T>>, AppError>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let fetch = Arc::clone(&self.fetch);
        let config = self.config;
        Box::pin(async move {
            Ok(respond(fetch.as_ref(), config, request).await.unwrap_or_else(IntoResponse::into_response))
        })
    }
}

async fn respond<F, Fut, T>(fetch: &F, config: ListConfig, mut request: Request) -> Result<Response, AppError>
where
    F: Fn(ListOptions, Request) -> Fut,
    Fut: Future<Output = Result<Option<Vec<T>>, AppError>>,
    T: Serialize,
{
    context::load_query(&mut request)?;
    let ctx = context::context_mut(&mut request);
    let options = ListOptions::from_query(ctx.query().unwrap_or(&Map::new()), config.default_limit)?;
    ctx.set_query_param("pos", Value::from(options.pos));
    ctx.set_query_param("limit", Value::from(options.limit));
    ctx.set_query_param("order-by", options.order_by.clone().into());
    ctx.set_query_param("order-dir", Value::from(options.order_direction.as_str()));
    ctx.set_list_options(options.clone());

    let items = tokio::time::timeout(config.fetch_timeout(), fetch(options.clone(), request))
        .await
        .map_err(|elapsed| {
            AppError::new(StatusCode::INTERNAL_SERVER_ERROR, codes::LIST_FETCH_FAILED, "list fetch timed out")
                .with_source(elapsed)
        })??
        .unwrap_or_default();

    let body = items
        .iter()
        .map(|item| Value::from_serialize(item).map(|value| serializer::to_json(&value)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| AppError::internal("list item could not be serialized").with_source(err))?;

    let mut headers = HeaderMap::new();
    headers.insert(LIST_COUNT_HEADER, HeaderValue::from(body.len()));
    headers.insert(LIST_POS_HEADER, HeaderValue::from(options.pos));
    headers.insert(LIST_PAGE_SIZE_HEADER, HeaderValue::from(options.limit));
    if let Some(order) = options.order_header().and_then(|order| HeaderValue::from_str(&order).ok()) {
        headers.insert(LIST_ORDER_HEADER, order);
    }

    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> Map {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), Value::from(*v))).collect()
    }

    #[test]
    fn test_defaults() {
        let options = ListOptions::from_query(&Map::new(), 10).unwrap();
        assert_eq!(
            options,
            ListOptions { pos: 0, limit: 10, order_by: None, order_direction: OrderDirection::Asc }
        );
        assert_eq!(options.order_header(), None);
    }

    #[test]
    fn test_full_options() {
        let options =
            ListOptions::from_query(&query(&[("pos", "20"), ("limit", "5.9"), ("order-by", " name "), ("order-dir", " DESC ")]), 10)
                .unwrap();
        assert_eq!(options.pos, 20);
        assert_eq!(options.limit, 5);
        assert_eq!(options.order_header().as_deref(), Some("name;desc"));
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let options = ListOptions::from_query(&query(&[("pos", ""), ("order-by", "   "), ("order-dir", "")]), 7).unwrap();
        assert_eq!((options.pos, options.limit, options.order_by), (0, 7, None));
    }

    #[test]
    fn test_invalid_values() {
        let code = |pairs: &[(&str, &str)]| ListOptions::from_query(&query(pairs), 10).unwrap_err().code().to_owned();
        assert_eq!(code(&[("pos", "-1")]), "ERR_QUERY_POS_INVALID");
        assert_eq!(code(&[("limit", "ten")]), "ERR_QUERY_LIMIT_INVALID");
        assert_eq!(code(&[("order-dir", "up")]), "ERR_QUERY_ORDER_DIR_INVALID");

        let mut repeated = Map::new();
        repeated.insert("order-by".into(), Value::from(json!(["a", "b"])));
        assert_eq!(ListOptions::from_query(&repeated, 10).unwrap_err().code(), "ERR_QUERY_ORDER_BY_INVALID");
    }

    #[test]
    fn test_options_serialize_for_fetchers() {
        let options = ListOptions { pos: 1, limit: 2, order_by: Some("id".into()), order_direction: OrderDirection::Desc };
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({ "pos": 1, "limit": 2, "order_by": "id", "order_direction": "desc" })
        );
    }
}
