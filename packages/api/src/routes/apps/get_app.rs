use axum::extract::{Path, State};
use axum::{Extension, Json};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

use super::{AppResponse, fetch_owned_app};

#[utoipa::path(
    get,
    path = "/api/apps/{name}",
    tag = "apps",
    params(("name" = String, Path, description = "App name")),
    responses(
        (status = 200, description = "App detail", body = AppResponse),
        (status = 404, description = "Unknown app")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "GET /api/apps/{name}", skip(state, user))]
pub async fn get_app(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
) -> Result<Json<AppResponse>, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;
    Ok(Json(AppResponse::from_model(
        app,
        &state.config.apps_domain_suffix,
    )))
}
