//! `GET/POST /docker/*` (§6): container lifecycle, images, networks.

use std::time::Duration;

use axum::extract::{Extension, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use nasd_core::validation::{validate, BulkContainerRequest};
use nasd_core::AppError;
use nasd_providers::ContainerProvider;
use serde::Serialize;

use crate::pipeline::correlation::CorrelationId;
use crate::response::envelope;
use crate::state::AppState;

const BULK_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn list_containers(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let containers = state.containers.list_containers().await?;
    Ok(envelope(&state, &correlation_id, containers))
}

pub async fn list_images(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let images = state.containers.list_images().await?;
    Ok(envelope(&state, &correlation_id, images))
}

pub async fn list_networks(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let networks = state.containers.list_networks().await?;
    Ok(envelope(&state, &correlation_id, networks))
}

pub async fn info(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let (containers, images, networks) = tokio::try_join!(
        state.containers.list_containers(),
        state.containers.list_images(),
        state.containers.list_networks(),
    )?;
    Ok(envelope(
        &state,
        &correlation_id,
        serde_json::json!({
            "container_count": containers.len(),
            "image_count": images.len(),
            "network_count": networks.len(),
        }),
    ))
}

pub async fn start_one(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.containers.start(&id, BULK_TIMEOUT).await?;
    Ok(envelope(&state, &correlation_id, state.containers.inspect_container(&id).await?))
}

pub async fn stop_one(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.containers.stop(&id, BULK_TIMEOUT).await?;
    Ok(envelope(&state, &correlation_id, state.containers.inspect_container(&id).await?))
}

#[derive(Serialize)]
struct BulkResult {
    total: usize,
    succeeded: usize,
    failed: usize,
    errors: Vec<String>,
}

async fn run_bulk<F, Fut>(containers: &[String], op: F) -> BulkResult
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Result<(), AppError>>,
{
    let mut succeeded = 0;
    let mut errors = Vec::new();
    for id in containers {
        match op(id.clone()).await {
            Ok(()) => succeeded += 1,
            Err(e) => errors.push(format!("{id}: {}", e.message())),
        }
    }
    BulkResult {
        total: containers.len(),
        succeeded,
        failed: errors.len(),
        errors,
    }
}

pub async fn bulk_start(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Json(body): Json<BulkContainerRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate(&body)?;
    let containers = state.containers.clone();
    let result = run_bulk(&body.container_ids, |id| {
        let containers = containers.clone();
        async move { containers.start(&id, BULK_TIMEOUT).await }
    })
    .await;
    Ok(envelope(&state, &correlation_id, result))
}

pub async fn bulk_stop(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Json(body): Json<BulkContainerRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate(&body)?;
    let containers = state.containers.clone();
    let result = run_bulk(&body.container_ids, |id| {
        let containers = containers.clone();
        async move { containers.stop(&id, BULK_TIMEOUT).await }
    })
    .await;
    Ok(envelope(&state, &correlation_id, result))
}

pub async fn bulk_restart(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Json(body): Json<BulkContainerRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate(&body)?;
    let containers = state.containers.clone();
    let result = run_bulk(&body.container_ids, |id| {
        let containers = containers.clone();
        async move { containers.restart(&id, BULK_TIMEOUT).await }
    })
    .await;
    Ok(envelope(&state, &correlation_id, result))
}
