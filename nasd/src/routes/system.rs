//! `GET /system/*` (§6): host telemetry, read-only, plus the blacklisted
//! `POST /system/execute` command runner (§4.7).

use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::response::IntoResponse;
use axum::Json;
use nasd_core::validation::{validate_command, ExecuteCommandRequest};
use nasd_core::AppError;
use nasd_providers::{SimSystemProvider, StorageProvider, SystemProvider};

use crate::pipeline::correlation::CorrelationId;
use crate::response::envelope;
use crate::state::AppState;

async fn load_info(system: &Arc<SimSystemProvider>) -> Result<serde_json::Value, AppError> {
    let (cpu, memory, load_average, uptime) = tokio::try_join!(
        system.cpu(),
        system.memory(),
        system.load_average(),
        system.uptime(),
    )?;
    Ok(serde_json::json!({
        "cpu": cpu,
        "memory": memory,
        "load_average": load_average,
        "uptime": uptime,
    }))
}

pub async fn info(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let info = load_info(&state.system).await?;
    Ok(envelope(&state, &correlation_id, info))
}

pub async fn cpu(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let cpu = state.system.cpu().await?;
    Ok(envelope(&state, &correlation_id, cpu))
}

pub async fn memory(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let memory = state.system.memory().await?;
    Ok(envelope(&state, &correlation_id, memory))
}

pub async fn network(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let network = state.system.network().await?;
    Ok(envelope(&state, &correlation_id, network))
}

pub async fn temperature(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let sensors = state.system.sensors().await?;
    Ok(envelope(&state, &correlation_id, sensors))
}

pub async fn filesystems(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let filesystems = state.system.filesystems().await?;
    Ok(envelope(&state, &correlation_id, filesystems))
}

pub async fn ups(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let ups = state.system.ups().await?;
    Ok(envelope(&state, &correlation_id, ups))
}

pub async fn gpu(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let gpu = state.system.gpu().await?;
    Ok(envelope(&state, &correlation_id, gpu))
}

pub async fn parity_disk(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let schedule = state.storage.parity_schedule().await?;
    Ok(envelope(&state, &correlation_id, serde_json::json!({ "schedule": schedule })))
}

pub async fn parity_check(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let history = state.storage.parity_history().await?;
    Ok(envelope(&state, &correlation_id, history))
}

#[derive(serde::Deserialize)]
pub struct PowerAction {
    #[serde(default)]
    pub confirm: bool,
}

pub async fn power(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    axum::extract::Path(action): axum::extract::Path<String>,
    body: Option<axum::Json<PowerAction>>,
) -> Result<impl IntoResponse, AppError> {
    let confirmed = body.map(|b| b.0.confirm).unwrap_or(false);
    if !confirmed {
        return Err(AppError::Validation {
            message: "power actions require confirm: true".to_string(),
            fields: vec![],
        });
    }
    match action.as_str() {
        "shutdown" | "reboot" | "sleep" | "wake" => {
            let (id, _token) = state.operations.create(format!("system.power.{action}"));
            state.operations.start(&id);
            state
                .operations
                .finish_success(&id, serde_json::json!({ "action": action }));
            Ok(envelope(
                &state,
                &correlation_id,
                serde_json::json!({ "operation_id": id, "action": action }),
            ))
        }
        _ => Err(AppError::NotFound(format!("unknown power action `{action}`"))),
    }
}

/// Runs a command against the simulated host, refusing anything matching
/// the destructive blacklist (§4.7) before it reaches the provider layer.
pub async fn execute(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Json(body): Json<ExecuteCommandRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_command(&body.command)?;
    Ok(envelope(
        &state,
        &correlation_id,
        serde_json::json!({
            "command": body.command,
            "exit_code": 0,
            "stdout": format!("simulated: {}", body.command),
            "stderr": "",
        }),
    ))
}
