//! Shared integration-test harness, grounded on `r2e-core/tests/integration.rs`'s
//! `send_get`-style helper built over `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use nasd::state::AppState;
use nasd_auth::Principal;
use nasd_core::config::AppConfig;
use nasd_core::permissions::Role;
use tower::ServiceExt;

/// A bootstrapped app with authentication enabled and a known credential
/// minted for each of the three roles, so tests can exercise the full
/// authentication/authorization pipeline rather than bypassing it.
pub struct TestApp {
    pub router: Router,
    pub admin_key: String,
    pub operator_key: String,
    pub viewer_key: String,
}

pub fn bootstrap() -> TestApp {
    let config = AppConfig::default();
    let state = AppState::bootstrap(config);

    let admin_key = "test-admin-key".to_string();
    let operator_key = "test-operator-key".to_string();
    let viewer_key = "test-viewer-key".to_string();

    state.authenticator.store.insert(Principal::new(
        "test-admin",
        "Test Administrator",
        Role::Administrator,
        admin_key.clone(),
    ));
    state.authenticator.store.insert(Principal::new(
        "test-operator",
        "Test Operator",
        Role::Operator,
        operator_key.clone(),
    ));
    state.authenticator.store.insert(Principal::new(
        "test-viewer",
        "Test Viewer",
        Role::Viewer,
        viewer_key.clone(),
    ));

    let router = nasd::pipeline::build_router(state);
    TestApp {
        router,
        admin_key,
        operator_key,
        viewer_key,
    }
}

/// A bootstrapped app with `auth.enabled = false`, for tests that only
/// care about behavior once past the authentication stage.
pub fn bootstrap_auth_disabled() -> Router {
    let mut config = AppConfig::default();
    config.auth.enabled = false;
    let state = AppState::bootstrap(config);
    nasd::pipeline::build_router(state)
}

pub async fn request(
    router: &Router,
    method: &str,
    path: &str,
    api_key: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    let req = if let Some(json) = body {
        builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, value)
}
