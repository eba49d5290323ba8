//! API modules and the router they build.
//!
//! The host registers each [`ApiModule`] with a [`Registry`] and asks it for
//! one axum [`Router`]. Every module router is mounted at its path with a
//! shared [`Guards`] factory, and the whole API gets:
//!
//! - a JSON 404 fallback (`ERR_NOT_FOUND`)
//! - `ApiConfig::body_limit` as the default body limit
//! - the request id and access log middleware
//! - CORS exposing the custom response headers
//!
//! Binding a socket and serving the router stay with the host.
//!
//! # Example
//!
//! ```ignore
//! struct Users;
//!
//! impl ApiModule for Users {
//!     fn name(&self) -> &str { "users" }
//!     fn mount_path(&self) -> &str { "/users" }
//!     fn router(&self, guards: &Guards) -> Router {
//!         Router::new().route_service("/", guards.list_endpoint(list_users))
//!     }
//! }
//!
//! let app = Registry::new().with_module(Users).build(&ApiConfig::default())?;
//! axum::serve(listener, app).await?;
//! ```

use crate::config::ApiConfig;
use crate::cors::cors_layer;
use crate::error::AppError;
use crate::guards::Guards;
use crate::middleware::request_id_layer;
use axum::Router;
use futures::future::BoxFuture;
use restguard_core::events::EventSink;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A group of routes mounted under one path.
pub trait ApiModule: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Path prefix, e.g. `/users`. `/` merges the routes at the root.
    fn mount_path(&self) -> &str;

    /// The module's routes, relative to [`ApiModule::mount_path`].
    fn router(&self, guards: &Guards) -> Router;

    /// Release resources when the host shuts down.
    fn shutdown(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

/// Errors building the router.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Nothing registered while `fail_without_routes` is set.
    #[error("no API modules registered")]
    NoRoutes,

    /// Two modules claim the same path.
    #[error("modules '{first}' and '{second}' are both mounted at '{path}'")]
    DuplicateMount {
        /// Normalized mount path.
        path: String,
        /// Module registered first.
        first: String,
        /// Module registered later.
        second: String,
    },
}

/// Registered API modules, in registration order.
#[derive(Default, Clone)]
pub struct Registry {
    modules: Vec<Arc<dyn ApiModule>>,
    events: Option<Arc<dyn EventSink>>,
}

impl Registry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module.
    pub fn register(&mut self, module: impl ApiModule) -> &mut Self {
        self.modules.push(Arc::new(module));
        self
    }

    /// Add a module, builder style.
    #[must_use]
    pub fn with_module(mut self, module: impl ApiModule) -> Self {
        self.register(module);
        self
    }

    /// Sink handed to every module's [`Guards`].
    #[must_use]
    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Registered module names.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|module| module.name())
    }

    /// Mount every module and wrap the result in the shared middleware.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NoRoutes`] when empty and `config.fail_without_routes`
    /// is set, [`RegistryError::DuplicateMount`] when two modules share a path.
    pub fn build(&self, config: &ApiConfig) -> Result<Router, RegistryError> {
        if self.modules.is_empty() && config.fail_without_routes {
            return Err(RegistryError::NoRoutes);
        }

        let mut guards = Guards::new(config.clone());
        if let Some(sink) = &self.events {
            guards = guards.with_events(Arc::clone(sink));
        }

        let mut mounted: Vec<(String, &str)> = Vec::with_capacity(self.modules.len());
        let mut app = Router::new();
        for module in &self.modules {
            let path = normalize_mount(module.mount_path());
            if let Some((_, first)) = mounted.iter().find(|(mounted_at, _)| *mounted_at == path) {
                return Err(RegistryError::DuplicateMount {
                    first: (*first).to_owned(),
                    second: module.name().to_owned(),
                    path,
                });
            }

            let routes = module.router(&guards);
            app = if path == "/" { app.merge(routes) } else { app.nest(&path, routes) };
            tracing::info!(module = module.name(), path = %path, "mounted API module");
            mounted.push((path, module.name()));
        }

        if mounted.is_empty() {
            tracing::warn!("no API modules registered");
        }

        Ok(app
            .fallback(|| async { AppError::not_found("no route matches the request") })
            .layer(guards.body_limit())
            .layer(cors_layer())
            .layer(request_id_layer()))
    }

    /// Run every module's shutdown hook, in registration order.
    pub async fn shutdown(&self) {
        for module in &self.modules {
            tracing::debug!(module = module.name(), "shutting down API module");
            module.shutdown().await;
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("modules", &self.module_names().collect::<Vec<_>>())
            .field("events", &self.events.is_some())
            .finish()
    }
}

fn normalize_mount(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("/{trimmed}")
}
