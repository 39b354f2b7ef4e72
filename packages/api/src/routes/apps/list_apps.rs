use axum::extract::State;
use axum::{Extension, Json};

use crate::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::state::AppState;

use super::AppResponse;

#[utoipa::path(
    get,
    path = "/api/apps",
    tag = "apps",
    responses((status = 200, description = "Apps owned by the caller", body = [AppResponse])),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "GET /api/apps", skip(state, user))]
pub async fn list_apps(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<AppResponse>>, ApiError> {
    let apps = db::apps::list_by_user(&state.db, user.user_id).await?;
    let suffix = &state.config.apps_domain_suffix;
    Ok(Json(
        apps.into_iter()
            .map(|app| AppResponse::from_model(app, suffix))
            .collect(),
    ))
}
