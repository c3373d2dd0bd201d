//! Handler-facing helpers for wrapping data in the §4.9 response envelope.

use axum::extract::Extension;
use axum::response::{IntoResponse, Json};
use nasd_core::envelope::Envelope;

use crate::pipeline::correlation::CorrelationId;
use crate::state::AppState;

pub fn envelope<T: serde::Serialize>(
    state: &AppState,
    correlation_id: &Extension<CorrelationId>,
    data: T,
) -> impl IntoResponse {
    Json(Envelope::ok(data, correlation_id.0.0.clone(), state.config.version.clone()))
}
