use axum::{
    Router,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db;
use crate::entity::app;
use crate::error::ApiError;
use crate::state::AppState;

pub mod activity;
pub mod create_app;
pub mod delete_app;
pub mod deployments;
pub mod domains;
pub mod env_vars;
pub mod get_app;
pub mod list_apps;
pub mod logs;
pub mod metrics;
pub mod restart;
pub mod scale;
pub mod update_app;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_apps::list_apps).post(create_app::create_app))
        .route(
            "/{name}",
            get(get_app::get_app)
                .put(update_app::update_app)
                .delete(delete_app::delete_app),
        )
        .route("/{name}/restart", post(restart::restart_app))
        .route(
            "/{name}/scale",
            get(scale::get_scale).post(scale::scale_app),
        )
        .route(
            "/{name}/deployments",
            get(deployments::list_deployments).post(deployments::create_deployment),
        )
        .route(
            "/{name}/deployments/{id}",
            get(deployments::get_deployment).post(deployments::rollback_deployment),
        )
        .route(
            "/{name}/env",
            get(env_vars::get_env_vars).put(env_vars::update_env_vars),
        )
        .route(
            "/{name}/domains",
            get(domains::list_domains).post(domains::add_domain),
        )
        .route(
            "/{name}/domains/{domain}",
            get(domains::get_domain).delete(domains::remove_domain),
        )
        .route(
            "/{name}/domains/{domain}/verify",
            post(domains::verify_domain),
        )
        .route("/{name}/logs", get(logs::get_logs))
        .route("/{name}/activity", get(activity::get_activity))
        .route("/{name}/metrics", get(metrics::get_metrics))
}

/// Common response shape for an app.
#[derive(Debug, Serialize, ToSchema)]
pub struct AppResponse {
    pub id: Uuid,
    pub name: String,
    pub region: String,
    pub size: String,
    pub status: String,
    pub deployment_count: i32,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppResponse {
    pub fn from_model(app: app::Model, domain_suffix: &str) -> Self {
        Self {
            url: format!("https://{}.{domain_suffix}", app.name),
            id: app.id,
            name: app.name,
            region: app.region,
            size: app.size,
            status: app.status,
            deployment_count: app.deployment_count,
            created_at: app.created_at,
            updated_at: app.updated_at,
        }
    }
}

/// Resolve an app through the `(owner, name)` key. Cross-owner access is a
/// plain 404 — no existence oracle.
pub async fn fetch_owned_app(
    state: &AppState,
    user_id: Uuid,
    name: &str,
) -> Result<app::Model, ApiError> {
    db::apps::get_by_name(&state.db, user_id, name)
        .await?
        .ok_or_else(|| ApiError::not_found("app not found"))
}
