//! Liveness and dependency status.

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

const DEPENDENCY_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(health))
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub kubernetes: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "All dependencies healthy", body = HealthResponse),
        (status = 503, description = "A required dependency is degraded", body = HealthResponse)
    )
)]
#[tracing::instrument(name = "GET /api/health", skip(state))]
pub async fn health(State(state): State<AppState>) -> Response {
    let mut response = HealthResponse {
        status: "ok".to_string(),
        database: "healthy".to_string(),
        kubernetes: "disconnected".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    match tokio::time::timeout(DEPENDENCY_PROBE_TIMEOUT, state.db.ping()).await {
        Ok(Ok(())) => {}
        _ => {
            response.database = "unhealthy".to_string();
            response.status = "degraded".to_string();
        }
    }

    if let Some(kube) = &state.kube {
        response.kubernetes =
            match tokio::time::timeout(DEPENDENCY_PROBE_TIMEOUT, kube.ping()).await {
                Ok(Ok(())) => "healthy".to_string(),
                _ => "unhealthy".to_string(),
            };
    }

    let status_code = if response.status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response)).into_response()
}
