//! Stage 6 — metrics (§4.1): per-request counters/histograms labeled by
//! method, matched route template, and status.

use std::time::Instant;

use axum::body::Body;
use axum::extract::{MatchedPath, Request};
use axum::http::header::CONTENT_LENGTH;
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::BodyExt;

use crate::metrics::{global, Metrics};

pub async fn record_metrics(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let path = Metrics::label_path(&path);

    let request_size = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok());

    let metrics = global();
    metrics.requests_in_flight.inc();
    if let Some(size) = request_size {
        metrics
            .request_size_bytes
            .with_label_values(&[&method, &path])
            .observe(size);
    }
    let started = Instant::now();

    let response = next.run(req).await;

    metrics.requests_in_flight.dec();
    let elapsed = started.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();
    metrics
        .requests_total
        .with_label_values(&[&method, &path, &status])
        .inc();
    metrics
        .request_duration_seconds
        .with_label_values(&[&method, &path])
        .observe(elapsed);

    // Collected (not just `Content-Length`) since a handler's body may not
    // carry that header yet at this point in the stack.
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.map(|c| c.to_bytes()).unwrap_or_default();
    metrics
        .response_size_bytes
        .with_label_values(&[&method, &path])
        .observe(bytes.len() as f64);

    Response::from_parts(parts, Body::from(bytes))
}
