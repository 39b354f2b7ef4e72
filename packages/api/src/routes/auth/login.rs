//! Start the GitHub OAuth handshake.

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::auth::jwt::generate_state;
use crate::db;
use crate::error::ApiError;
use crate::state::AppState;

const STATE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// `cli=true` flags the state for a CLI token exchange.
    #[serde(default)]
    pub cli: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/auth/login",
    tag = "auth",
    params(
        ("redirect_uri" = Option<String>, Query, description = "Post-login redirect target"),
        ("cli" = Option<String>, Query, description = "Return tokens as JSON on callback")
    ),
    responses((status = 302, description = "Redirect to the OAuth provider"))
)]
#[tracing::instrument(name = "GET /api/auth/login", skip(state))]
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, ApiError> {
    let Some(github) = state.github_client() else {
        return Err(ApiError::service_unavailable("github oauth not configured"));
    };

    let redirect_uri = query
        .redirect_uri
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "/".to_string());
    let cli_token_exchange = query.cli.as_deref() == Some("true");

    let nonce = generate_state();
    let expires_at = Utc::now() + Duration::minutes(STATE_TTL_MINUTES);

    db::oauth_states::create(
        &state.db,
        &nonce,
        Some(redirect_uri),
        cli_token_exchange,
        expires_at,
    )
    .await
    .map_err(|err| {
        tracing::error!("failed to create oauth state: {err}");
        ApiError::internal("failed to create oauth state")
    })?;

    let auth_url = github.auth_url(&nonce);
    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, auth_url)],
    )
        .into_response())
}
