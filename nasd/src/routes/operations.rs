//! `GET/DELETE /operations[/{id}]`, `GET /operations/stats` (§4.4, §6).

use axum::extract::{Extension, Path, Query, State};
use axum::response::IntoResponse;
use nasd_async::OperationState;
use nasd_core::AppError;
use serde::Deserialize;

use crate::pipeline::correlation::CorrelationId;
use crate::response::envelope;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    class: Option<String>,
    state: Option<String>,
}

fn parse_state(raw: &str) -> Result<OperationState, AppError> {
    match raw {
        "pending" => Ok(OperationState::Pending),
        "running" => Ok(OperationState::Running),
        "succeeded" => Ok(OperationState::Succeeded),
        "failed" => Ok(OperationState::Failed),
        "cancelled" => Ok(OperationState::Cancelled),
        other => Err(AppError::Validation {
            message: format!("unknown operation state `{other}`"),
            fields: vec![],
        }),
    }
}

pub async fn list(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter_state = query.state.as_deref().map(parse_state).transpose()?;
    let operations = state.operations.list(query.class.as_deref(), filter_state);
    Ok(envelope(&state, &correlation_id, operations))
}

pub async fn get(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let operation = state
        .operations
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("operation {id} not found")))?;
    Ok(envelope(&state, &correlation_id, operation))
}

pub async fn cancel(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.operations.cancel(&id) {
        return Err(AppError::Conflict(format!(
            "operation {id} is not cancellable (missing or already terminal)"
        )));
    }
    let operation = state.operations.get(&id);
    Ok(envelope(&state, &correlation_id, operation))
}

pub async fn stats(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let all = state.operations.list(None, None);
    let mut counts = std::collections::HashMap::new();
    for op in &all {
        *counts.entry(format!("{:?}", op.state).to_lowercase()).or_insert(0u64) += 1;
    }
    Ok(envelope(
        &state,
        &correlation_id,
        serde_json::json!({ "total": all.len(), "by_state": counts }),
    ))
}
