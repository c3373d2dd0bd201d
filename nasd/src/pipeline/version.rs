//! Stage 4 — version selection (§4.1): an `Accept: application/vnd.nasd.v{N}+json`
//! media type picks a response version; absent or unparseable, the
//! configured default applies. No handler currently branches on it, but the
//! extension is threaded through so one can without touching the pipeline.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

#[derive(Debug, Clone, Copy)]
pub struct ApiVersion(pub u32);

const ACCEPT_PREFIX: &str = "application/vnd.nasd.v";
const ACCEPT_SUFFIX: &str = "+json";

fn parse_accept(value: &str) -> Option<u32> {
    value
        .strip_prefix(ACCEPT_PREFIX)?
        .strip_suffix(ACCEPT_SUFFIX)?
        .parse()
        .ok()
}

pub async fn version_selection(mut req: Request, next: Next) -> Response {
    let version = req
        .headers()
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_accept)
        .unwrap_or(1);
    req.extensions_mut().insert(ApiVersion(version));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versioned_media_type() {
        assert_eq!(parse_accept("application/vnd.nasd.v2+json"), Some(2));
        assert_eq!(parse_accept("application/json"), None);
    }
}
