//! Stage 10 — rate limiting (§4.3, §4.1): operation-classed token buckets
//! keyed by principal id (or peer address when unauthenticated). S3: a
//! second `GET /storage/smart` within the window is denied with the
//! class's 429 shape.

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use nasd_auth::AuthenticatedPrincipal;
use nasd_core::AppError;
use nasd_ratelimit::OperationClass;
use std::net::SocketAddr;

use crate::state::AppState;

pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let class = OperationClass::classify(&method, &path);

    let client = req
        .extensions()
        .get::<AuthenticatedPrincipal>()
        .map(|p| p.id.clone())
        .or_else(|| req.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0.to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    match state.rate_limiter.allow(&client, class) {
        Ok(()) => next.run(req).await,
        Err(denied) => AppError::rate_limited(denied.class, denied.retry_after_seconds).into_response(),
    }
}
