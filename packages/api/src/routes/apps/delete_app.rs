use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Extension;

use crate::activity;
use crate::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::middleware::rate_limit::ClientIp;
use crate::state::AppState;

use super::fetch_owned_app;

#[utoipa::path(
    delete,
    path = "/api/apps/{name}",
    tag = "apps",
    params(("name" = String, Path, description = "App name")),
    responses(
        (status = 204, description = "App deleted"),
        (status = 404, description = "Unknown app")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "DELETE /api/apps/{name}", skip(state, user))]
pub async fn delete_app(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;

    // Deleting the namespace garbage-collects every cluster object.
    // Best-effort: the database row goes away regardless.
    if let Some(kube) = &state.kube {
        if let Err(err) = kube.delete_app(&app.name).await {
            tracing::warn!(app = %app.name, "failed to delete namespace: {err}");
        }
    }

    db::apps::delete(&state.db, app.id).await?;

    let ip = Some(client_ip);
    activity::record(
        &state,
        user.user_id,
        None,
        "app.delete",
        Some(serde_json::json!({ "name": app.name })),
        ip,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
