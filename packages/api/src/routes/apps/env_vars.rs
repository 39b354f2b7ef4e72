//! Environment variable management. Values are stored as one AES-GCM
//! blob; GET redacts unless `redacted=false`, PUT replaces the whole map.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::activity;
use crate::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::middleware::rate_limit::ClientIp;
use crate::state::AppState;
use crate::vault;

use super::fetch_owned_app;

const REDACTION_MASK: &str = "••••••••";

#[derive(Debug, Deserialize)]
pub struct EnvQuery {
    #[serde(default)]
    pub redacted: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnvVarsResponse {
    pub variables: HashMap<String, String>,
    pub count: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEnvVarsRequest {
    pub variables: HashMap<String, String>,
}

#[utoipa::path(
    get,
    path = "/api/apps/{name}/env",
    tag = "env",
    params(
        ("name" = String, Path, description = "App name"),
        ("redacted" = Option<String>, Query, description = "Pass `false` to reveal values")
    ),
    responses(
        (status = 200, description = "Environment map, redacted by default", body = EnvVarsResponse),
        (status = 404, description = "Unknown app")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "GET /api/apps/{name}/env", skip(state, user))]
pub async fn get_env_vars(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
    Query(query): Query<EnvQuery>,
) -> Result<Json<EnvVarsResponse>, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;
    let redacted = query.redacted.as_deref() != Some("false");

    let blob = app.env_vars_encrypted.unwrap_or_default();
    if blob.is_empty() {
        return Ok(Json(EnvVarsResponse {
            variables: HashMap::new(),
            count: 0,
        }));
    }

    let mut variables = vault::decrypt(&blob, &state.config.encryption_key)
        .map_err(|_| ApiError::internal("failed to decrypt environment variables"))?;

    let count = variables.len();
    if redacted {
        variables = redact(&variables);
    }

    Ok(Json(EnvVarsResponse { variables, count }))
}

#[utoipa::path(
    put,
    path = "/api/apps/{name}/env",
    tag = "env",
    params(("name" = String, Path, description = "App name")),
    request_body = UpdateEnvVarsRequest,
    responses(
        (status = 200, description = "Map replaced atomically", body = EnvVarsResponse),
        (status = 404, description = "Unknown app")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "PUT /api/apps/{name}/env", skip(state, user, input))]
pub async fn update_env_vars(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Path(name): Path<String>,
    Json(input): Json<UpdateEnvVarsRequest>,
) -> Result<Json<EnvVarsResponse>, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;

    let encrypted = vault::encrypt(&input.variables, &state.config.encryption_key)
        .map_err(|_| ApiError::internal("failed to encrypt environment variables"))?;

    db::apps::update_env_vars(&state.db, app.id, encrypted).await?;

    let ip = Some(client_ip);
    activity::record(
        &state,
        user.user_id,
        Some(app.id),
        "env.update",
        Some(serde_json::json!({ "count": input.variables.len() })),
        ip,
    )
    .await;

    Ok(Json(EnvVarsResponse {
        count: input.variables.len(),
        variables: redact(&input.variables),
    }))
}

fn redact(variables: &HashMap<String, String>) -> HashMap<String, String> {
    variables
        .keys()
        .map(|key| (key.clone(), REDACTION_MASK.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_masks_every_value() {
        let vars = HashMap::from([
            ("A".to_string(), "1".to_string()),
            ("B".to_string(), "2".to_string()),
        ]);
        let masked = redact(&vars);
        assert_eq!(masked.len(), 2);
        assert!(masked.values().all(|v| v == REDACTION_MASK));
        assert!(!REDACTION_MASK.is_empty());
    }
}
