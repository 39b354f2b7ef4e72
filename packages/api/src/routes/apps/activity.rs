//! Per-app audit trail, paginated.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::routes::validate::clamp_pagination;
use crate::state::AppState;

use super::fetch_owned_app;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityResponse {
    pub activities: Vec<ActivityEntry>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

#[utoipa::path(
    get,
    path = "/api/apps/{name}/activity",
    tag = "activity",
    params(
        ("name" = String, Path, description = "App name"),
        ("limit" = Option<u64>, Query, description = "Page size, 1..=100, default 50"),
        ("offset" = Option<u64>, Query, description = "Page offset, default 0")
    ),
    responses(
        (status = 200, description = "Audit rows, newest first", body = ActivityResponse),
        (status = 404, description = "Unknown app")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "GET /api/apps/{name}/activity", skip(state, user))]
pub async fn get_activity(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;
    let (limit, offset) = clamp_pagination(query.limit, query.offset);

    let rows = db::activity::list_by_app(&state.db, app.id, limit, offset).await?;
    let total = db::activity::count_by_app(&state.db, app.id)
        .await
        .unwrap_or(0);

    let activities = rows
        .into_iter()
        .map(|log| ActivityEntry {
            id: log.id,
            action: log.action,
            details: log.details,
            ip_address: log.ip_address,
            created_at: log.created_at,
        })
        .collect();

    Ok(Json(ActivityResponse {
        activities,
        total,
        limit,
        offset,
    }))
}
