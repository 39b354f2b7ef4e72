//! Complete the GitHub OAuth handshake: consume the state nonce, exchange
//! the code, upsert the user and issue a session token pair.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::activity;
use crate::auth::jwt::generate_token_pair;
use crate::db;
use crate::db::users::GitHubProfile;
use crate::error::ApiError;
use crate::middleware::rate_limit::ClientIp;
use crate::state::AppState;

use super::{auth_cookie, validate_redirect};

const REFRESH_COOKIE_MAX_AGE: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/auth/callback",
    tag = "auth",
    params(
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("state" = Option<String>, Query, description = "State nonce from login")
    ),
    responses(
        (status = 302, description = "Cookies set, redirect to post-login target"),
        (status = 200, description = "CLI exchange: token pair as JSON"),
        (status = 400, description = "Invalid or expired state")
    )
)]
#[tracing::instrument(name = "GET /api/auth/callback", skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    if let Some(error) = query.error {
        let body = json!({
            "error": error,
            "description": query.error_description.unwrap_or_default(),
        });
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    let (Some(code), Some(nonce)) = (query.code, query.state) else {
        return Err(ApiError::bad_request("missing code or state"));
    };

    // Single use: the row is gone after this regardless of outcome.
    let oauth_state = db::oauth_states::consume(&state.db, &nonce)
        .await?
        .ok_or_else(|| ApiError::bad_request("invalid or expired state"))?;

    if oauth_state.expires_at < Utc::now() {
        return Err(ApiError::bad_request("state expired"));
    }

    let Some(github) = state.github_client() else {
        return Err(ApiError::service_unavailable("github oauth not configured"));
    };

    let access_token = github.exchange_code(&code).await.map_err(|err| {
        tracing::error!("github code exchange failed: {err}");
        ApiError::internal("failed to exchange code for token")
    })?;

    let gh_user = github.fetch_user(&access_token).await.map_err(|err| {
        tracing::error!("github profile fetch failed: {err}");
        ApiError::internal("failed to get user from github")
    })?;

    let user = db::users::upsert_github_user(
        &state.db,
        GitHubProfile {
            github_id: gh_user.id,
            username: gh_user.login,
            email: gh_user.email.unwrap_or_default(),
            avatar_url: gh_user.avatar_url,
        },
    )
    .await?;

    let pair = generate_token_pair(user.id, &user.username, &state.config.jwt_secret)?;

    let ip = Some(client_ip);
    activity::record(&state, user.id, None, "user.login", None, ip).await;

    if oauth_state.cli_token_exchange {
        let body = json!({
            "access_token": pair.access_token,
            "refresh_token": pair.refresh_token,
            "expires_at": pair.expires_at,
            "token_type": pair.token_type,
            "user": {
                "id": user.id,
                "username": user.username,
                "email": user.email,
            },
        });
        return Ok(Json(body).into_response());
    }

    let secure = !state.config.is_development();
    let access_max_age = (pair.expires_at - Utc::now()).num_seconds().max(0);

    let redirect_uri = validate_redirect(
        oauth_state.redirect_uri.as_deref().unwrap_or("/"),
        headers.get(header::HOST).and_then(|v| v.to_str().ok()),
    );

    let mut response = (
        StatusCode::FOUND,
        [(header::LOCATION, redirect_uri)],
    )
        .into_response();

    let cookies = [
        auth_cookie("access_token", &pair.access_token, access_max_age, secure),
        auth_cookie(
            "refresh_token",
            &pair.refresh_token,
            REFRESH_COOKIE_MAX_AGE,
            secure,
        ),
    ];
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    Ok(response)
}
