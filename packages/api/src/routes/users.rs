//! The authenticated user's own profile.

use axum::extract::State;
use axum::{Extension, Json, Router, routing::get};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub plan: String,
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Authenticated user profile", body = UserResponse),
        (status = 404, description = "User no longer exists")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "GET /api/users/me", skip(state, user))]
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let found = db::users::get_by_id(&state.db, user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(UserResponse {
        id: found.id,
        username: found.username,
        email: found.email,
        avatar_url: found.avatar_url,
        plan: found.plan,
    }))
}
