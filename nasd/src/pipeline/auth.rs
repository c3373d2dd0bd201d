//! Stage 8 — authentication (§4.6, §4.1): bearer-then-API-key resolution
//! via `nasd_auth::Authenticator`. Requests to [`PUBLIC_PATHS`] pass through
//! unauthenticated (S2); everything else without a resolvable credential is
//! rejected before it reaches a handler.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use nasd_auth::AuthenticatedPrincipal;
use nasd_core::permissions::Role;
use nasd_core::AppError;

use crate::state::AppState;

/// Paths reachable without a credential, regardless of the `auth.enabled`
/// configuration flag.
pub const PUBLIC_PATHS: &[&str] = &["/health", "/metrics", "/docs", "/openapi.json", "/auth/login"];

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || path == "/"
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn api_key_header(req: &Request) -> Option<String> {
    req.headers()
        .get(nasd_auth::API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();

    if !state.config.auth.enabled {
        req.extensions_mut().insert(AuthenticatedPrincipal {
            id: "anonymous".to_string(),
            display_name: "auth disabled".to_string(),
            role: Role::Administrator,
        });
        return next.run(req).await;
    }

    if is_public(&path) {
        return next.run(req).await;
    }

    let bearer = bearer_token(&req);
    let api_key = api_key_header(&req);
    match state.authenticator.resolve(bearer.as_deref(), api_key.as_deref()) {
        Some(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        None => AppError::Unauthenticated("missing or invalid credential".to_string()).into_response(),
    }
}
