//! API token management: mint, list, revoke.
//!
//! The plaintext token is returned exactly once at creation; only its
//! digest is kept. Minting requires a session principal — an API token
//! cannot create further tokens.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::activity;
use crate::auth::jwt::{generate_api_token, hash_token};
use crate::auth::{AuthUser, Principal};
use crate::db;
use crate::entity::api_token;
use crate::error::ApiError;
use crate::middleware::rate_limit::ClientIp;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTokenRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// Optional lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenResponse {
    fn from_model(model: api_token::Model, token: Option<String>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            token,
            created_at: model.created_at,
            expires_at: model.expires_at,
        }
    }
}

fn require_session(user: &AuthUser) -> Result<(), ApiError> {
    match user.principal {
        Principal::Session(_) => Ok(()),
        Principal::ApiToken(_) => Err(ApiError::unauthorized("session token required")),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/token",
    tag = "auth",
    request_body = CreateTokenRequest,
    responses(
        (status = 201, description = "Token created; plaintext shown once", body = TokenResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "POST /api/auth/token", skip(state, user, input))]
pub async fn create_token(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Json(input): Json<CreateTokenRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    require_session(&user)?;

    let name = input
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "API Token".to_string());

    let expires_at = input
        .expires_in
        .filter(|seconds| *seconds > 0)
        .map(|seconds| Utc::now() + Duration::seconds(seconds));

    let token = generate_api_token();
    let digest = hash_token(&token);

    let created = db::tokens::create(&state.db, user.user_id, &name, &digest, expires_at).await?;

    let ip = Some(client_ip);
    activity::record(
        &state,
        user.user_id,
        None,
        "token.create",
        Some(serde_json::json!({ "name": created.name })),
        ip,
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse::from_model(created, Some(token))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/token",
    tag = "auth",
    responses((status = 200, description = "Tokens without plaintext", body = [TokenResponse])),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "GET /api/auth/token", skip(state, user))]
pub async fn list_tokens(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<TokenResponse>>, ApiError> {
    require_session(&user)?;

    let tokens = db::tokens::list_by_user(&state.db, user.user_id).await?;
    Ok(Json(
        tokens
            .into_iter()
            .map(|t| TokenResponse::from_model(t, None))
            .collect(),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/auth/token/{id}",
    tag = "auth",
    params(("id" = Uuid, Path, description = "Token id")),
    responses(
        (status = 204, description = "Token revoked"),
        (status = 404, description = "Unknown token")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "DELETE /api/auth/token/{id}", skip(state, user))]
pub async fn revoke_token(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_session(&user)?;

    let id: Uuid = id
        .parse()
        .map_err(|_| ApiError::bad_request("invalid token id"))?;

    let removed = db::tokens::delete_for_user(&state.db, user.user_id, id).await?;
    if removed == 0 {
        return Err(ApiError::not_found("token not found"));
    }

    let ip = Some(client_ip);
    activity::record(
        &state,
        user.user_id,
        None,
        "token.revoke",
        Some(serde_json::json!({ "token_id": id })),
        ip,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
