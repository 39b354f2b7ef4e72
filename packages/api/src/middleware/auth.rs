//! Principal resolution: session JWTs and opaque API tokens.
//!
//! Public paths pass through untouched. Everything else requires a bearer
//! credential (header or `access_token` cookie); the resolved principal is
//! attached as an [`AuthUser`] request extension.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::auth::jwt::{API_TOKEN_PREFIX, hash_token, validate_token, verify_token_hash};
use crate::auth::{AuthUser, Principal, extract_bearer_token, is_public_path};
use crate::db;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response<Body>, ApiError> {
    if is_public_path(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let Some(token) = extract_bearer_token(request.headers()) else {
        return Err(ApiError::unauthorized("missing authorization"));
    };

    let user = if token.starts_with(API_TOKEN_PREFIX) {
        resolve_api_token(&state, &token).await?
    } else {
        resolve_session_token(&state, &token)?
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn resolve_session_token(state: &AppState, token: &str) -> Result<AuthUser, ApiError> {
    let claims = validate_token(token, &state.config.jwt_secret)
        .map_err(|_| ApiError::unauthorized("invalid token"))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.username.clone(),
        principal: Principal::Session(claims),
    })
}

async fn resolve_api_token(state: &AppState, token: &str) -> Result<AuthUser, ApiError> {
    let digest = hash_token(token);
    let found = db::tokens::find_by_hash(&state.db, &digest)
        .await
        .map_err(|err| {
            tracing::error!("failed to look up api token: {err}");
            ApiError::unauthorized("invalid api token")
        })?;

    let Some(api_token) = found else {
        return Err(ApiError::unauthorized("invalid api token"));
    };

    if !verify_token_hash(token, &api_token.token_hash) {
        return Err(ApiError::unauthorized("invalid api token"));
    }

    // Expiry is measured against current time, never creation time.
    if let Some(expires_at) = api_token.expires_at {
        if expires_at < Utc::now() {
            return Err(ApiError::unauthorized("token expired"));
        }
    }

    if let Err(err) = db::tokens::touch_last_used(&state.db, api_token.id).await {
        tracing::warn!(token_id = %api_token.id, "failed to update token last_used: {err}");
    }

    let user = db::users::get_by_id(&state.db, api_token.user_id)
        .await
        .map_err(|_| ApiError::unauthorized("user not found"))?
        .ok_or_else(|| ApiError::unauthorized("user not found"))?;

    Ok(AuthUser {
        user_id: user.id,
        username: user.username,
        principal: Principal::ApiToken(api_token.id),
    })
}
