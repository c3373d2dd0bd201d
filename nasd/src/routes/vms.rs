//! `GET /vms`, `POST /vms/{name}/{action}` (§6).

use axum::extract::{Extension, Path, State};
use axum::response::IntoResponse;
use nasd_core::AppError;
use nasd_providers::VirtualizationProvider;

use crate::pipeline::correlation::CorrelationId;
use crate::response::envelope;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let vms = state.vms.list().await?;
    Ok(envelope(&state, &correlation_id, vms))
}

pub async fn action(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Path((name, action)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    match action.as_str() {
        "start" => state.vms.start(&name).await?,
        "stop" => state.vms.stop(&name).await?,
        "autostart-on" => state.vms.set_autostart(&name, true).await?,
        "autostart-off" => state.vms.set_autostart(&name, false).await?,
        _ => return Err(AppError::NotFound(format!("unknown vm action `{action}`"))),
    }
    let vm = state.vms.inspect(&name).await?;
    Ok(envelope(&state, &correlation_id, vm))
}
