//! Per-endpoint-label request metrics (§4.1 stage 6), grounded on
//! `r2e-prometheus`'s registry/encode idiom but hand-rolled against the
//! `prometheus` crate directly (the teacher's `r2e-observability` OTel
//! stack is distributed-tracing infrastructure this single-binary daemon
//! has no backend for; `prometheus` + `tracing` alone cover §1's ambient
//! logging/metrics requirement without that weight).

use std::sync::OnceLock;

use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Registry, TextEncoder,
};

pub struct Metrics {
    pub registry: Registry,
    pub requests_total: IntCounterVec,
    pub request_duration_seconds: HistogramVec,
    pub requests_in_flight: IntGauge,
    pub request_size_bytes: HistogramVec,
    pub response_size_bytes: HistogramVec,
    pub stream_dropped_frames_total: IntCounterVec,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            prometheus::Opts::new("nasd_http_requests_total", "total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric construction");
        let request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "nasd_http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "path"],
        )
        .expect("metric construction");
        let requests_in_flight = IntGauge::new(
            "nasd_http_requests_in_flight",
            "HTTP requests currently being served",
        )
        .expect("metric construction");
        let request_size_bytes = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "nasd_http_request_size_bytes",
                "HTTP request body size in bytes",
            ),
            &["method", "path"],
        )
        .expect("metric construction");
        let response_size_bytes = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "nasd_http_response_size_bytes",
                "HTTP response body size in bytes",
            ),
            &["method", "path"],
        )
        .expect("metric construction");
        let stream_dropped_frames_total = IntCounterVec::new(
            prometheus::Opts::new(
                "nasd_stream_dropped_frames_total",
                "data frames dropped by a connection's write queue on overflow",
            ),
            &["channel"],
        )
        .expect("metric construction");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("register metric");
        registry
            .register(Box::new(request_duration_seconds.clone()))
            .expect("register metric");
        registry
            .register(Box::new(requests_in_flight.clone()))
            .expect("register metric");
        registry
            .register(Box::new(request_size_bytes.clone()))
            .expect("register metric");
        registry
            .register(Box::new(response_size_bytes.clone()))
            .expect("register metric");
        registry
            .register(Box::new(stream_dropped_frames_total.clone()))
            .expect("register metric");

        Self {
            registry,
            requests_total,
            request_duration_seconds,
            requests_in_flight,
            request_size_bytes,
            response_size_bytes,
            stream_dropped_frames_total,
        }
    }

    pub fn encode(&self) -> String {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .expect("encode metrics");
        String::from_utf8(buf).unwrap_or_default()
    }

    /// Normalize a matched route pattern to a stable label (axum already
    /// gives us the route template, e.g. `/vms/{name}`, not the literal
    /// path, so no further normalization is needed at this layer).
    pub fn label_path(matched_path: &str) -> String {
        matched_path.to_string()
    }
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

pub fn global() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

pub async fn handler() -> impl axum::response::IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        global().encode(),
    )
}
