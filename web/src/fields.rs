//! Field guards: one predicate bound to one request location.
//!
//! The four locations share one contract:
//!
//! 1. read the named value (absent reads as `undefined`)
//! 2. if it is missing and the field is optional, admit without running the predicate
//! 3. if it is missing and required, reject with `ERR_<LOC>_<FIELD>_MISSING`
//! 4. otherwise run the predicate and write its result back to the same place
//!
//! Validation failures become 400 responses with a structured code. Predicate
//! defects become 500 responses and are never reported as client errors.
//!
//! Body fields additionally require a JSON body (`ERR_BODY_MISSING`), and
//! route parameters are always required.

use crate::context::{self, RequestContext};
use crate::error::{AppError, codes};
use crate::guard::{Admitted, Guard};
use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use futures::future::BoxFuture;
use restguard_core::{CheckError, Predicate, Value, checks};
use std::fmt;
use std::sync::Arc;

/// Where in the request a field lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// JSON body field.
    Body,
    /// Query string parameter.
    Query,
    /// Request header (case-insensitive).
    Header,
    /// Route parameter.
    Param,
}

impl Location {
    /// Segment used in error codes.
    #[must_use]
    pub const fn code_prefix(self) -> &'static str {
        match self {
            Self::Body => "BODY",
            Self::Query => "QUERY",
            Self::Header => "HEADER",
            Self::Param => "PARAM",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Body => "body field",
            Self::Query => "query parameter",
            Self::Header => "header",
            Self::Param => "route parameter",
        })
    }
}

/// Per-field options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldOptions {
    /// Admit the request when the field is missing.
    pub optional: bool,
}

impl FieldOptions {
    /// The field must be present.
    #[must_use]
    pub const fn required() -> Self {
        Self { optional: false }
    }

    /// The field may be missing.
    #[must_use]
    pub const fn optional() -> Self {
        Self { optional: true }
    }
}

/// Guard validating one field. Build it through [`crate::Guards`].
pub struct FieldGuard {
    location: Location,
    name: String,
    predicate: Arc<dyn Predicate>,
    optional: bool,
    body_limit: usize,
}

impl FieldGuard {
    pub(crate) fn new(
        location: Location,
        name: impl Into<String>,
        predicate: impl Predicate,
        options: FieldOptions,
        body_limit: usize,
    ) -> Self {
        Self {
            location,
            name: name.into(),
            predicate: Arc::new(predicate),
            optional: options.optional && location != Location::Param,
            body_limit,
        }
    }

    /// Field location.
    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, mut request: Request) -> Result<Admitted, AppError> {
        match self.location {
            Location::Body => {
                request = context::load_body(request, self.body_limit).await?;
                if !context::context_mut(&mut request).has_body() {
                    return Err(AppError::bad_request(codes::BODY_MISSING, "request has no JSON body"));
                }
            }
            Location::Query => context::load_query(&mut request)?,
            Location::Param => request = context::load_params(request).await,
            Location::Header => {}
        }

        let current = self.read(&mut request);
        let Some(value) = checks::optional(self.optional, current)
            .map_err(|err| AppError::invalid_field(self.location, &self.name, err.kind()))?
        else {
            return Ok(Admitted::new(request));
        };

        let received = value.kind_name();
        let validated = match self.predicate.apply(value) {
            Ok(validated) => validated,
            Err(CheckError::Validation(err)) => {
                tracing::debug!(location = %self.location, field = %self.name, received, kind = %err.kind(), "field rejected");
                return Err(AppError::invalid_field(self.location, &self.name, err.kind()));
            }
            Err(defect @ CheckError::Defect(_)) => {
                return Err(AppError::internal(format!("predicate for {} '{}' failed", self.location, self.name))
                    .with_source(defect));
            }
        };

        self.write(&mut request, validated);
        Ok(Admitted::new(request))
    }

    fn read(&self, request: &mut Request) -> Value {
        let name = self.name.as_str();
        match self.location {
            Location::Header => request
                .headers()
                .get(name)
                .map_or(Value::Undefined, |value| Value::from(String::from_utf8_lossy(value.as_bytes()).into_owned())),
            Location::Body => read_from(context::context_mut(request), RequestContext::body_field, name),
            Location::Query => read_from(context::context_mut(request), RequestContext::query_param, name),
            Location::Param => read_from(context::context_mut(request), RequestContext::param, name),
        }
    }

    fn write(&self, request: &mut Request, value: Value) {
        let name = self.name.as_str();
        if self.location == Location::Header {
            if let (Ok(header), Some(text)) = (HeaderName::try_from(name), value.as_str()) {
                if let Ok(header_value) = HeaderValue::from_str(text) {
                    request.headers_mut().insert(header, header_value);
                }
            }
        }
        let ctx = context::context_mut(request);
        match self.location {
            Location::Body => ctx.set_body_field(name, value),
            Location::Query => ctx.set_query_param(name, value),
            Location::Param => ctx.set_param(name, value),
            Location::Header => ctx.set_header(name, value),
        }
    }
}

fn read_from(
    ctx: &RequestContext,
    lookup: for<'a> fn(&'a RequestContext, &str) -> Option<&'a Value>,
    name: &str,
) -> Value {
    lookup(ctx, name).cloned().unwrap_or_default()
}

impl Guard for FieldGuard {
    fn inspect(&self, request: Request) -> BoxFuture<'_, Result<Admitted, AppError>> {
        Box::pin(self.run(request))
    }
}

impl fmt::Debug for FieldGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldGuard")
            .field("location", &self.location)
            .field("name", &self.name)
            .field("optional", &self.optional)
            .finish_non_exhaustive()
    }
}
