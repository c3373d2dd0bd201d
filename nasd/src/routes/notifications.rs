//! `GET/POST/DELETE /notifications[...]` (§4.12, §6).

use axum::extract::{Extension, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use nasd_core::AppError;
use nasd_providers::notifications::NotificationLevel;
use serde::Deserialize;

use crate::pipeline::correlation::CorrelationId;
use crate::response::envelope;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(envelope(&state, &correlation_id, state.notifications.list()))
}

#[derive(Deserialize)]
pub struct CreateNotification {
    level: String,
    title: String,
    message: String,
}

fn parse_level(raw: &str) -> Result<NotificationLevel, AppError> {
    match raw {
        "info" => Ok(NotificationLevel::Info),
        "warning" => Ok(NotificationLevel::Warning),
        "error" => Ok(NotificationLevel::Error),
        other => Err(AppError::Validation {
            message: format!("unknown notification level `{other}`"),
            fields: vec![],
        }),
    }
}

pub async fn create(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Json(body): Json<CreateNotification>,
) -> Result<impl IntoResponse, AppError> {
    let level = parse_level(&body.level)?;
    let notification = state.notifications.create(level, body.title, body.message);
    Ok(envelope(&state, &correlation_id, notification))
}

pub async fn mark_read(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.notifications.mark_read(id) {
        return Err(AppError::NotFound(format!("notification {id} not found")));
    }
    Ok(envelope(&state, &correlation_id, serde_json::json!({ "id": id, "read": true })))
}

pub async fn clear(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    state.notifications.clear();
    Ok(envelope(&state, &correlation_id, serde_json::json!({ "cleared": true })))
}
