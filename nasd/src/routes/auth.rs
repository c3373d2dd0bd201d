//! `POST /auth/login`, `GET /auth/users`, `POST /auth/users/{id}/regenerate-key`
//! (§4.6, §6). S1: login with a valid API key returns an access token,
//! its type, TTL, and the resolved user.

use axum::extract::{Extension, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use nasd_core::AppError;
use serde::{Deserialize, Serialize};

use crate::pipeline::correlation::CorrelationId;
use crate::response::envelope;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    api_key: String,
}

#[derive(Serialize)]
struct LoginUser {
    id: String,
    display_name: String,
    role: nasd_core::permissions::Role,
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: u64,
    user: LoginUser,
}

pub async fn login(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = state
        .authenticator
        .store
        .authenticate_credential(&body.api_key)
        .ok_or_else(|| AppError::Unauthenticated("invalid api key".to_string()))?;

    let (access_token, expires_in) = state
        .authenticator
        .tokens
        .issue(&principal)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(envelope(
        &state,
        &correlation_id,
        LoginResponse {
            access_token,
            token_type: "Bearer",
            expires_in,
            user: LoginUser {
                id: principal.id.clone(),
                display_name: principal.display_name.clone(),
                role: principal.role,
            },
        },
    ))
}

pub async fn list_users(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
) -> Result<impl IntoResponse, AppError> {
    let users: Vec<_> = state
        .authenticator
        .store
        .list()
        .into_iter()
        .map(|p| {
            serde_json::json!({
                "id": p.id,
                "display_name": p.display_name,
                "role": p.role,
                "enabled": p.enabled,
                "created_at": p.created_at,
                "last_used_at": p.last_used_at,
            })
        })
        .collect();
    Ok(envelope(&state, &correlation_id, users))
}

pub async fn regenerate_key(
    State(state): State<AppState>,
    correlation_id: Extension<CorrelationId>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let new_key = state
        .authenticator
        .store
        .regenerate_key(&id)
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;
    Ok(envelope(&state, &correlation_id, serde_json::json!({ "api_key": new_key })))
}
