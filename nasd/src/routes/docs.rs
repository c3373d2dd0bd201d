//! `GET /docs`, `GET /openapi.json` (§6): a minimal, hand-maintained
//! description of the HTTP surface — no codegen, since the daemon has no
//! macro-derived route registry to generate it from.

use axum::response::{Html, IntoResponse, Json};

pub async fn docs() -> impl IntoResponse {
    Html(
        "<!doctype html><html><head><title>nasd</title></head><body>\
         <h1>nasd management API</h1>\
         <p>See <a href=\"/openapi.json\">/openapi.json</a> for the machine-readable surface.</p>\
         </body></html>",
    )
}

pub async fn openapi() -> impl IntoResponse {
    Json(serde_json::json!({
        "openapi": "3.0.3",
        "info": { "title": "nasd", "version": env!("CARGO_PKG_VERSION") },
        "paths": {
            "/health": { "get": { "summary": "Liveness and readiness aggregate" } },
            "/metrics": { "get": { "summary": "Prometheus exposition" } },
            "/system/info": { "get": { "summary": "Combined host telemetry" } },
            "/storage/array": { "get": { "summary": "Array and disk status" } },
            "/docker/containers": { "get": { "summary": "List containers" } },
            "/vms": { "get": { "summary": "List virtual machines" } },
            "/operations": { "get": { "summary": "List async operations" } },
            "/notifications": { "get": { "summary": "List notifications" } },
            "/auth/login": { "post": { "summary": "Exchange an API key for a signed token" } }
        }
    }))
}
