use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::activity;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::kubernetes::{AppStatus, MAX_REPLICAS, MIN_REPLICAS};
use crate::middleware::rate_limit::ClientIp;
use crate::state::AppState;

use super::fetch_owned_app;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScaleRequest {
    pub replicas: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScaleResponse {
    pub success: bool,
    pub replicas: i32,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/apps/{name}/scale",
    tag = "apps",
    params(("name" = String, Path, description = "App name")),
    request_body = ScaleRequest,
    responses(
        (status = 200, description = "Scaling initiated", body = ScaleResponse),
        (status = 400, description = "Replicas out of range"),
        (status = 404, description = "Unknown app")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "POST /api/apps/{name}/scale", skip(state, user, input))]
pub async fn scale_app(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Path(name): Path<String>,
    Json(input): Json<ScaleRequest>,
) -> Result<Json<ScaleResponse>, ApiError> {
    // Bounds check precedes any side effect or cluster round trip.
    if !(MIN_REPLICAS..=MAX_REPLICAS).contains(&input.replicas) {
        return Err(ApiError::bad_request(format!(
            "replicas must be between {MIN_REPLICAS} and {MAX_REPLICAS}"
        )));
    }

    let app = fetch_owned_app(&state, user.user_id, &name).await?;

    let Some(kube) = &state.kube else {
        return Err(ApiError::internal("kubernetes not available"));
    };

    kube.scale_app(&app.name, input.replicas).await?;

    let ip = Some(client_ip);
    activity::record(
        &state,
        user.user_id,
        Some(app.id),
        "app.scale",
        Some(serde_json::json!({ "replicas": input.replicas })),
        ip,
    )
    .await;

    Ok(Json(ScaleResponse {
        success: true,
        replicas: input.replicas,
        message: "scaling initiated".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/apps/{name}/scale",
    tag = "apps",
    params(("name" = String, Path, description = "App name")),
    responses(
        (status = 200, description = "Live rollout status", body = AppStatus),
        (status = 404, description = "Unknown app")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "GET /api/apps/{name}/scale", skip(state, user))]
pub async fn get_scale(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
) -> Result<Json<AppStatus>, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;

    let Some(kube) = &state.kube else {
        return Err(ApiError::internal("kubernetes not available"));
    };

    Ok(Json(kube.get_app_status(&app.name).await?))
}
