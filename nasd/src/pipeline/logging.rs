//! Stage 7 — logging (§4.1): one structured `tracing` event per completed
//! request, correlation id included, matching the teacher's access-log
//! shape (method, path, status, latency).

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::pipeline::correlation::CorrelationId;

pub async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let correlation_id = req
        .extensions()
        .get::<CorrelationId>()
        .map(|c| c.0.clone())
        .unwrap_or_default();
    let started = Instant::now();

    let response = next.run(req).await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let status = response.status().as_u16();
    if status >= 500 {
        tracing::error!(%method, %path, status, elapsed_ms, correlation_id, "request failed");
    } else if status >= 400 {
        tracing::warn!(%method, %path, status, elapsed_ms, correlation_id, "request rejected");
    } else {
        tracing::info!(%method, %path, status, elapsed_ms, correlation_id, "request served");
    }
    response
}
