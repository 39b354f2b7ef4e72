//! Clear the auth cookies.

use axum::extract::State;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::state::AppState;

use super::auth_cookie;

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Cookies cleared")),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "POST /api/auth/logout", skip(state))]
pub async fn logout(State(state): State<AppState>) -> Response {
    let secure = !state.config.is_development();
    let mut response = Json(json!({ "message": "logged out" })).into_response();

    for name in ["access_token", "refresh_token"] {
        let cookie = auth_cookie(name, "", 0, secure);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}
