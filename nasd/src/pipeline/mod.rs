//! Request pipeline (§4.1): eleven stages, composed as axum middleware and
//! tower layers, outermost first — panic guard, correlation, CORS, version
//! selection, compression, metrics, logging, authentication, authorization,
//! rate limiting, then dispatch to the matched route.

pub mod auth;
pub mod authz;
pub mod correlation;
pub mod logging;
pub mod metrics;
pub mod ratelimit;
pub mod version;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::routes;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(routes::health::health))
        .route("/metrics", get(crate::metrics::handler))
        .route("/docs", get(routes::docs::docs))
        .route("/openapi.json", get(routes::docs::openapi))
        .route("/system/info", get(routes::system::info))
        .route("/system/cpu", get(routes::system::cpu))
        .route("/system/memory", get(routes::system::memory))
        .route("/system/network", get(routes::system::network))
        .route("/system/temperature", get(routes::system::temperature))
        .route("/system/filesystems", get(routes::system::filesystems))
        .route("/system/ups", get(routes::system::ups))
        .route("/system/gpu", get(routes::system::gpu))
        .route("/system/parity/disk", get(routes::system::parity_disk))
        .route("/system/parity/check", get(routes::system::parity_check))
        .route("/system/power/{action}", post(routes::system::power))
        .route("/system/execute", post(routes::system::execute))
        .route("/storage/array", get(routes::storage::array))
        .route("/storage/array/start", post(routes::storage::start))
        .route("/storage/array/stop", post(routes::storage::stop))
        .route("/storage/cache", get(routes::storage::cache))
        .route("/storage/disks", get(routes::storage::disks))
        .route("/storage/boot", get(routes::storage::boot))
        .route("/storage/smart", get(routes::storage::smart))
        .route("/storage/zfs", get(routes::storage::zfs))
        .route("/storage/general", get(routes::storage::general))
        .route(
            "/docker/containers",
            get(routes::docker::list_containers),
        )
        .route("/docker/containers/{id}/start", post(routes::docker::start_one))
        .route("/docker/containers/{id}/stop", post(routes::docker::stop_one))
        .route("/docker/containers/bulk/start", post(routes::docker::bulk_start))
        .route("/docker/containers/bulk/stop", post(routes::docker::bulk_stop))
        .route("/docker/containers/bulk/restart", post(routes::docker::bulk_restart))
        .route("/docker/images", get(routes::docker::list_images))
        .route("/docker/networks", get(routes::docker::list_networks))
        .route("/docker/info", get(routes::docker::info))
        .route("/vms", get(routes::vms::list))
        .route("/vms/{name}/{action}", post(routes::vms::action))
        .route("/operations", get(routes::operations::list))
        .route("/operations/stats", get(routes::operations::stats))
        .route("/operations/{id}", get(routes::operations::get))
        .route("/operations/{id}", delete(routes::operations::cancel))
        .route("/notifications", get(routes::notifications::list))
        .route("/notifications", post(routes::notifications::create))
        .route("/notifications/clear", post(routes::notifications::clear))
        .route("/notifications/{id}/read", post(routes::notifications::mark_read))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/users", get(routes::auth::list_users))
        .route(
            "/auth/users/{id}/regenerate-key",
            post(routes::auth::regenerate_key),
        )
        .route("/ws", get(routes::ws::ws_unified))
        .route("/ws/system", get(routes::ws::ws_system))
        .route("/ws/storage", get(routes::ws::ws_storage))
        .route("/ws/docker", get(routes::ws::ws_docker))
        .route("/mcp", get(routes::mcp::mcp_handler))
        .with_state(state.clone());

    router
        .layer(from_fn_with_state(state.clone(), ratelimit::rate_limit))
        .layer(from_fn(authz::authorize))
        .layer(from_fn_with_state(state.clone(), auth::authenticate))
        .layer(from_fn(logging::access_log))
        .layer(from_fn(metrics::record_metrics))
        .layer(CompressionLayer::new())
        .layer(from_fn(version::version_selection))
        .layer(CorsLayer::permissive())
        .layer(from_fn(correlation::correlation))
        .layer(CatchPanicLayer::new())
}
