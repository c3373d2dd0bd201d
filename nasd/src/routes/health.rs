//! `GET /health` (§4.10, §6): always 200 for a reachable daemon process,
//! body status reflects probe aggregation (S2: no credential required).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.health.aggregate().await;
    (StatusCode::from_u16(report.status_code()).unwrap_or(StatusCode::OK), Json(report))
}
