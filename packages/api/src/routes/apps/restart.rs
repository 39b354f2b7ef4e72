use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::activity;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::middleware::rate_limit::ClientIp;
use crate::state::AppState;

use super::fetch_owned_app;

#[derive(Debug, Serialize, ToSchema)]
pub struct RestartResponse {
    pub success: bool,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/apps/{name}/restart",
    tag = "apps",
    params(("name" = String, Path, description = "App name")),
    responses(
        (status = 200, description = "Rollout restart triggered", body = RestartResponse),
        (status = 404, description = "Unknown app"),
        (status = 500, description = "Cluster unavailable")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "POST /api/apps/{name}/restart", skip(state, user))]
pub async fn restart_app(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Path(name): Path<String>,
) -> Result<Json<RestartResponse>, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;

    let Some(kube) = &state.kube else {
        return Err(ApiError::internal("kubernetes not available"));
    };

    kube.restart_app(&app.name).await?;

    let ip = Some(client_ip);
    activity::record(&state, user.user_id, Some(app.id), "app.restart", None, ip).await;

    Ok(Json(RestartResponse {
        success: true,
        message: "restart initiated".to_string(),
    }))
}
