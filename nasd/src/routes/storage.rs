//! `GET/POST /storage/*` (§6): array, cache, disks, SMART, boot, ZFS.

use axum::extract::{Extension, State};
use axum::response::IntoResponse;
use nasd_core::AppError;
use nasd_providers::StorageProvider;

use crate::pipeline::correlation::CorrelationId;
use crate::response::envelope;
use crate::state::AppState;

pub async fn array(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let status = state.storage.array_status().await?;
    Ok(envelope(&state, &correlation_id, status))
}

pub async fn disks(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let status = state.storage.array_status().await?;
    Ok(envelope(&state, &correlation_id, status.disks))
}

pub async fn smart(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let reports = state.storage.smart_reports().await?;
    Ok(envelope(&state, &correlation_id, reports))
}

pub async fn cache(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let capacities = state.storage.capacities().await?;
    Ok(envelope(&state, &correlation_id, capacities))
}

pub async fn boot(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let power = state.storage.power_states().await?;
    Ok(envelope(&state, &correlation_id, power))
}

/// No ZFS pools in this appliance's simulated backend — an empty list is the
/// correct answer, not a 404.
pub async fn zfs(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(envelope(&state, &correlation_id, Vec::<serde_json::Value>::new()))
}

pub async fn general(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let (array, capacities) = tokio::try_join!(state.storage.array_status(), state.storage.capacities())?;
    Ok(envelope(
        &state,
        &correlation_id,
        serde_json::json!({ "array": array, "capacities": capacities }),
    ))
}

pub async fn start(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    state.storage.start_array().await?;
    Ok(envelope(&state, &correlation_id, serde_json::json!({ "started": true })))
}

pub async fn stop(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    state.storage.stop_array().await?;
    Ok(envelope(&state, &correlation_id, serde_json::json!({ "started": false })))
}
