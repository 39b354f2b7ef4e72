//! Deployment lifecycle endpoints: list, create, inspect, rollback.
//!
//! Creation returns the `pending` row immediately; the cluster apply runs
//! on a spawned task serialized per app.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::activity;
use crate::auth::AuthUser;
use crate::db;
use crate::deploy;
use crate::entity::deployment;
use crate::error::ApiError;
use crate::middleware::rate_limit::ClientIp;
use crate::routes::validate::clamp_pagination;
use crate::state::AppState;

use super::fetch_owned_app;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDeploymentRequest {
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeploymentResponse {
    pub id: Uuid,
    pub app_id: Uuid,
    pub version: i32,
    pub image: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_at: Option<DateTime<Utc>>,
}

impl From<deployment::Model> for DeploymentResponse {
    fn from(d: deployment::Model) -> Self {
        Self {
            id: d.id,
            app_id: d.app_id,
            version: d.version,
            image: d.image,
            status: d.status,
            message: d.message,
            error: d.error,
            created_at: d.created_at,
            started_at: d.started_at,
            ready_at: d.ready_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/apps/{name}/deployments",
    tag = "deployments",
    params(
        ("name" = String, Path, description = "App name"),
        ("limit" = Option<u64>, Query, description = "Page size, 1..=100"),
        ("offset" = Option<u64>, Query, description = "Page offset")
    ),
    responses(
        (status = 200, description = "Deployments, newest version first", body = [DeploymentResponse]),
        (status = 404, description = "Unknown app")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "GET /api/apps/{name}/deployments", skip(state, user))]
pub async fn list_deployments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DeploymentResponse>>, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;
    let (limit, offset) = clamp_pagination(query.limit, query.offset);

    let rows = db::deployments::list_by_app(&state.db, app.id, limit, offset).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/apps/{name}/deployments",
    tag = "deployments",
    params(("name" = String, Path, description = "App name")),
    request_body = CreateDeploymentRequest,
    responses(
        (status = 201, description = "Pending deployment with the next version", body = DeploymentResponse),
        (status = 400, description = "Missing image"),
        (status = 404, description = "Unknown app")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "POST /api/apps/{name}/deployments", skip(state, user, input))]
pub async fn create_deployment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Path(name): Path<String>,
    Json(input): Json<CreateDeploymentRequest>,
) -> Result<(StatusCode, Json<DeploymentResponse>), ApiError> {
    if input.image.is_empty() {
        return Err(ApiError::bad_request("image is required"));
    }

    let app = fetch_owned_app(&state, user.user_id, &name).await?;
    let created = deploy::create_deployment(&state.db, &app, &input.image).await?;

    let ip = Some(client_ip);
    activity::record(
        &state,
        user.user_id,
        Some(app.id),
        "deployment.create",
        Some(serde_json::json!({ "image": input.image, "version": created.version })),
        ip,
    )
    .await;

    tokio::spawn(deploy::apply_deployment(
        state.clone(),
        app,
        created.clone(),
    ));

    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    get,
    path = "/api/apps/{name}/deployments/{id}",
    tag = "deployments",
    params(
        ("name" = String, Path, description = "App name"),
        ("id" = Uuid, Path, description = "Deployment id")
    ),
    responses(
        (status = 200, description = "Deployment detail", body = DeploymentResponse),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Unknown app or deployment")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "GET /api/apps/{name}/deployments/{id}", skip(state, user))]
pub async fn get_deployment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Json<DeploymentResponse>, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;
    let found = fetch_app_deployment(&state, app.id, &id).await?;
    Ok(Json(found.into()))
}

#[utoipa::path(
    post,
    path = "/api/apps/{name}/deployments/{id}",
    tag = "deployments",
    description = "Roll back to a prior deployment's image under a new, higher version.",
    params(
        ("name" = String, Path, description = "App name"),
        ("id" = Uuid, Path, description = "Deployment id to roll back to")
    ),
    responses(
        (status = 201, description = "New pending deployment", body = DeploymentResponse),
        (status = 404, description = "Unknown app or deployment")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "POST /api/apps/{name}/deployments/{id}", skip(state, user))]
pub async fn rollback_deployment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Path((name, id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<DeploymentResponse>), ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;
    let prior = fetch_app_deployment(&state, app.id, &id).await?;

    let created = deploy::rollback(&state.db, &app, &prior).await?;

    let ip = Some(client_ip);
    activity::record(
        &state,
        user.user_id,
        Some(app.id),
        "deployment.rollback",
        Some(serde_json::json!({
            "rolled_back_to": prior.version,
            "version": created.version,
        })),
        ip,
    )
    .await;

    tokio::spawn(deploy::apply_deployment(
        state.clone(),
        app,
        created.clone(),
    ));

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Parse the id, fetch the row and check it belongs to the app; mismatch
/// is a 404, same as unknown.
async fn fetch_app_deployment(
    state: &AppState,
    app_id: Uuid,
    id: &str,
) -> Result<deployment::Model, ApiError> {
    let id: Uuid = id
        .parse()
        .map_err(|_| ApiError::bad_request("invalid deployment id"))?;

    let found = db::deployments::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("deployment not found"))?;

    if found.app_id != app_id {
        return Err(ApiError::not_found("deployment not found"));
    }
    Ok(found)
}
