//! # Restguard Web
//!
//! Axum integration for Restguard: request guards in front of handlers, a
//! two-phase session gate and paginated list endpoints.
//!
//! # Request Flow
//!
//! ```text
//! request ─▶ request id / access log ─▶ CORS ─▶ router
//!                                                 │
//!              ┌──────────────────────────────────┘
//!              ▼
//!   guard ─▶ guard ─▶ ... ─▶ handler ─▶ response (+ guard headers)
//!     │
//!     └─ rejection: status, X-Error: <code>, {"code","message"}
//! ```
//!
//! Guards share one [`RequestContext`] stored in the request extensions:
//! parsed query, route parameters, JSON body, verified identity, origin and
//! list options. Each guard validates one thing and writes its normalized
//! value back, so later guards and the handler see the cleaned data.
//!
//! # Example
//!
//! ```ignore
//! use restguard_web::{FieldOptions, Guards, ApiConfig, Rules};
//! use tower::ServiceBuilder;
//!
//! let guards = Guards::new(ApiConfig::default());
//! let app = Router::new().route(
//!     "/users",
//!     post(create_user).route_layer(
//!         ServiceBuilder::new()
//!             .layer(guards.check_session_token(verifier))
//!             .layer(guards.requires_authentication())
//!             .layer(guards.check_body_field("email", Rules::new().not_blank(), FieldOptions::required())),
//!     ),
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod context;
pub mod cors;
pub mod error;
pub mod extractors;
pub mod fields;
pub mod guard;
pub mod guards;
pub mod list;
pub mod middleware;
pub mod origin;
pub mod registry;
pub mod session;

pub use config::{ApiConfig, ListConfig};
pub use context::RequestContext;
pub use cors::cors_layer;
pub use error::{AppError, ERROR_HEADER, codes};
pub use extractors::{Authenticated, ClientIp, RequestOrigin, ValidatedJson};
pub use fields::{FieldGuard, FieldOptions, Location};
pub use guard::{Admitted, Guard, GuardLayer, GuardService};
pub use guards::Guards;
pub use list::{ListEndpoint, ListOptions, OrderDirection};
pub use middleware::{AuthenticatedSession, REQUEST_ID_HEADER, RequestId, request_id_layer};
pub use origin::{OriginGuard, normalize_origin};
pub use registry::{ApiModule, Registry, RegistryError};
pub use session::{AuthenticationGate, PendingFailure, SessionAuthenticator};

pub use restguard_auth::{SessionClaims, SessionConfig, SessionVerifier};
pub use restguard_core::{CheckError, Rules, Value};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
