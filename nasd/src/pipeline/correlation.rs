//! Stage 2 — correlation (§4.1): accept a well-formed inbound correlation
//! header, otherwise mint a fresh one; always write it back on the response.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use nasd_core::ids::{is_valid_correlation_id, new_correlation_id};

pub const CORRELATION_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

pub async fn correlation(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| is_valid_correlation_id(s))
        .map(|s| s.to_string())
        .unwrap_or_else(new_correlation_id);

    req.extensions_mut().insert(CorrelationId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    async fn ok() -> &'static str {
        "ok"
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(ok))
            .layer(axum::middleware::from_fn(correlation))
    }

    #[tokio::test]
    async fn mints_fresh_id_when_absent() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let header = response.headers().get(CORRELATION_HEADER).unwrap();
        assert_eq!(header.to_str().unwrap().len(), 32);
    }

    #[tokio::test]
    async fn echoes_well_formed_client_id() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(CORRELATION_HEADER, "client-supplied-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let header = response.headers().get(CORRELATION_HEADER).unwrap();
        assert_eq!(header.to_str().unwrap(), "client-supplied-id");
    }
}
