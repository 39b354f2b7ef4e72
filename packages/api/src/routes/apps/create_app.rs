use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::activity;
use crate::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::middleware::rate_limit::ClientIp;
use crate::routes::validate::{validate_app_name, validate_region, validate_size};
use crate::state::AppState;

use super::AppResponse;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAppRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/apps",
    tag = "apps",
    request_body = CreateAppRequest,
    responses(
        (status = 201, description = "App created", body = AppResponse),
        (status = 400, description = "Validation failure"),
        (status = 409, description = "Name already taken by the caller")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "POST /api/apps", skip(state, user, input))]
pub async fn create_app(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Json(input): Json<CreateAppRequest>,
) -> Result<(StatusCode, Json<AppResponse>), ApiError> {
    validate_app_name(&input.name)?;

    let region = input.region.filter(|r| !r.is_empty()).unwrap_or_else(|| "gdl".to_string());
    let size = input.size.filter(|s| !s.is_empty()).unwrap_or_else(|| "starter".to_string());
    validate_region(&region)?;
    validate_size(&size)?;

    let created = db::apps::create(&state.db, user.user_id, &input.name, &region, &size)
        .await
        .map_err(|err| {
            ApiError::from_unique_violation(err, "app with this name already exists")
        })?;

    let ip = Some(client_ip);
    activity::record(
        &state,
        user.user_id,
        Some(created.id),
        "app.create",
        Some(serde_json::json!({ "name": created.name, "region": region, "size": size })),
        ip,
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(AppResponse::from_model(
            created,
            &state.config.apps_domain_suffix,
        )),
    ))
}
