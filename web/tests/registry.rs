//! Registry integration tests: mounting, shared middleware and shutdown.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::routing::{get, post};
use futures::future::BoxFuture;
use restguard_testing::RecordingSink;
use restguard_web::{
    ApiConfig, ApiModule, AppError, FieldOptions, Guards, ListOptions, Registry, RegistryError, Rules, ValidatedJson,
};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

type ShutdownLog = Arc<Mutex<Vec<&'static str>>>;

struct Health;

impl ApiModule for Health {
    fn name(&self) -> &str {
        "health"
    }

    fn mount_path(&self) -> &str {
        "/"
    }

    fn router(&self, _guards: &Guards) -> Router {
        Router::new().route("/health", get(|| async { "ok" }))
    }
}

struct Users {
    shutdowns: ShutdownLog,
    path: &'static str,
}

impl ApiModule for Users {
    fn name(&self) -> &str {
        "users"
    }

    fn mount_path(&self) -> &str {
        self.path
    }

    fn router(&self, guards: &Guards) -> Router {
        Router::new()
            .route_service(
                "/",
                guards.list_endpoint(|_options: ListOptions, _req: Request| async {
                    Ok::<_, AppError>(Some(vec!["ada", "grace"]))
                }),
            )
            .route(
                "/search",
                get(|| async { "found" })
                    .route_layer(guards.check_query_parameter("q", Rules::new().not_blank(), FieldOptions::required())),
            )
    }

    fn shutdown(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.shutdowns.lock().unwrap().push("users");
        })
    }
}

struct Audit {
    shutdowns: ShutdownLog,
}

impl ApiModule for Audit {
    fn name(&self) -> &str {
        "audit"
    }

    fn mount_path(&self) -> &str {
        "/audit/"
    }

    fn router(&self, _guards: &Guards) -> Router {
        Router::new().route("/", get(|| async { "audit" }))
    }

    fn shutdown(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.shutdowns.lock().unwrap().push("audit");
        })
    }
}

fn registry(shutdowns: &ShutdownLog) -> Registry {
    Registry::new()
        .with_module(Health)
        .with_module(Users { shutdowns: Arc::clone(shutdowns), path: "/users" })
        .with_module(Audit { shutdowns: Arc::clone(shutdowns) })
        .with_events(Arc::new(RecordingSink::new()))
}

fn get_request(uri: &str) -> Request {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn modules_are_mounted_at_their_paths() {
    let app = registry(&Arc::default()).build(&ApiConfig::default()).unwrap();

    let health = app.clone().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let users = app.clone().oneshot(get_request("/users")).await.unwrap();
    assert_eq!(users.status(), StatusCode::OK);
    assert_eq!(users.headers()["x-list-count"], "2");

    let audit = app.oneshot(get_request("/audit")).await.unwrap();
    assert_eq!(audit.status(), StatusCode::OK);
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let app = registry(&Arc::default()).build(&ApiConfig::default()).unwrap();

    let ok = app.clone().oneshot(get_request("/health")).await.unwrap();
    let rejected = app.oneshot(get_request("/users/search")).await.unwrap();

    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert_eq!(rejected.headers()["x-error"], "ERR_QUERY_Q_MISSING");
    for response in [&ok, &rejected] {
        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert_eq!(id.len(), 8);
    }
    assert_ne!(ok.headers()["x-request-id"], rejected.headers()["x-request-id"]);
}

#[tokio::test]
async fn unknown_routes_get_a_json_404() {
    let app = registry(&Arc::default()).build(&ApiConfig::default()).unwrap();

    let response = app.oneshot(get_request("/nowhere")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-error"], "ERR_NOT_FOUND");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn cors_exposes_custom_headers() {
    let app = registry(&Arc::default()).build(&ApiConfig::default()).unwrap();

    let request = Request::builder().uri("/users").header("origin", "https://app.test").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    let exposed = response.headers()["access-control-expose-headers"].to_str().unwrap();
    for name in ["x-error", "x-request-id", "x-list-count", "x-list-pos", "x-list-page-size", "x-list-order"] {
        assert!(exposed.contains(name), "{name} not exposed in {exposed}");
    }
}

struct Signups;

impl ApiModule for Signups {
    fn name(&self) -> &str {
        "signups"
    }

    fn mount_path(&self) -> &str {
        "/signups"
    }

    fn router(&self, _guards: &Guards) -> Router {
        Router::new().route("/", post(|ValidatedJson(body): ValidatedJson<serde_json::Value>| async move { body.to_string() }))
    }
}

#[tokio::test]
async fn configured_body_limit_applies_to_every_module() {
    let app = Registry::new().with_module(Signups).build(&ApiConfig::default().with_body_limit(32)).unwrap();

    let body = serde_json::json!({ "name": "x".repeat(256) }).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/signups")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.headers()["x-error"], "ERR_BODY_TOO_LARGE");
}

#[test]
fn duplicate_mounts_are_refused() {
    let shutdowns = ShutdownLog::default();
    let registry = Registry::new()
        .with_module(Users { shutdowns: Arc::clone(&shutdowns), path: "/people" })
        .with_module(Users { shutdowns, path: "people/" });

    assert_eq!(
        registry.build(&ApiConfig::default()).unwrap_err(),
        RegistryError::DuplicateMount { path: "/people".into(), first: "users".into(), second: "users".into() }
    );
}

#[test]
fn empty_registry_can_be_refused() {
    let config = ApiConfig::default().with_fail_without_routes(true);
    assert_eq!(Registry::new().build(&config).unwrap_err(), RegistryError::NoRoutes);
}

#[tokio::test]
async fn shutdown_runs_hooks_in_registration_order() {
    let shutdowns = ShutdownLog::default();
    let registry = registry(&shutdowns);
    assert_eq!(registry.module_names().collect::<Vec<_>>(), ["health", "users", "audit"]);

    registry.shutdown().await;
    assert_eq!(*shutdowns.lock().unwrap(), ["users", "audit"]);
}
