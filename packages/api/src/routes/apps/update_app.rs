use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::activity;
use crate::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::middleware::rate_limit::ClientIp;
use crate::routes::validate::{validate_region, validate_size};
use crate::state::AppState;

use super::{AppResponse, fetch_owned_app};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAppRequest {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

#[utoipa::path(
    put,
    path = "/api/apps/{name}",
    tag = "apps",
    params(("name" = String, Path, description = "App name")),
    request_body = UpdateAppRequest,
    responses(
        (status = 200, description = "Updated app", body = AppResponse),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Unknown app")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "PUT /api/apps/{name}", skip(state, user, input))]
pub async fn update_app(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Path(name): Path<String>,
    Json(input): Json<UpdateAppRequest>,
) -> Result<Json<AppResponse>, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;

    let region = match input.region.filter(|r| !r.is_empty()) {
        Some(region) => {
            validate_region(&region)?;
            region
        }
        None => app.region.clone(),
    };
    let size = match input.size.filter(|s| !s.is_empty()) {
        Some(size) => {
            validate_size(&size)?;
            size
        }
        None => app.size.clone(),
    };

    let app_id = app.id;
    let updated = db::apps::update_settings(&state.db, app, region.clone(), size.clone()).await?;

    let ip = Some(client_ip);
    activity::record(
        &state,
        user.user_id,
        Some(app_id),
        "app.update",
        Some(serde_json::json!({ "region": region, "size": size })),
        ip,
    )
    .await;

    Ok(Json(AppResponse::from_model(
        updated,
        &state.config.apps_domain_suffix,
    )))
}
