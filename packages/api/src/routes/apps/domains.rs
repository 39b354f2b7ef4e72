//! Custom domain management and DNS verification.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::activity;
use crate::auth::AuthUser;
use crate::db;
use crate::dns;
use crate::entity::domain;
use crate::error::ApiError;
use crate::middleware::rate_limit::ClientIp;
use crate::routes::validate::validate_domain;
use crate::state::AppState;

use super::fetch_owned_app;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDomainRequest {
    #[serde(default)]
    pub domain: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DomainResponse {
    pub id: Uuid,
    pub domain: String,
    pub verified: bool,
    pub ssl_status: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

impl From<domain::Model> for DomainResponse {
    fn from(d: domain::Model) -> Self {
        Self {
            id: d.id,
            domain: d.domain,
            verified: d.verified,
            ssl_status: d.ssl_status,
            created_at: d.created_at,
            verified_at: d.verified_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    pub domain: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/apps/{name}/domains",
    tag = "domains",
    params(("name" = String, Path, description = "App name")),
    responses(
        (status = 200, description = "Domains attached to the app", body = [DomainResponse]),
        (status = 404, description = "Unknown app")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "GET /api/apps/{name}/domains", skip(state, user))]
pub async fn list_domains(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
) -> Result<Json<Vec<DomainResponse>>, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;
    let domains = db::domains::list_by_app(&state.db, app.id).await?;
    Ok(Json(domains.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/apps/{name}/domains",
    tag = "domains",
    params(("name" = String, Path, description = "App name")),
    request_body = CreateDomainRequest,
    responses(
        (status = 201, description = "Domain attached, pending verification", body = DomainResponse),
        (status = 400, description = "Malformed hostname"),
        (status = 409, description = "Domain taken anywhere on the platform")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "POST /api/apps/{name}/domains", skip(state, user, input))]
pub async fn add_domain(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Path(name): Path<String>,
    Json(input): Json<CreateDomainRequest>,
) -> Result<(StatusCode, Json<DomainResponse>), ApiError> {
    validate_domain(&input.domain)?;

    let app = fetch_owned_app(&state, user.user_id, &name).await?;

    if db::domains::get_by_name(&state.db, &input.domain)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("domain already exists"));
    }

    let mut created = db::domains::create(&state.db, app.id, &input.domain)
        .await
        .map_err(|err| ApiError::from_unique_violation(err, "domain already exists"))?;

    // Best-effort provider CNAME; verification still gates activation.
    if let Some(dns_client) = &state.dns {
        match dns_client
            .create_cname(&input.domain, &state.config.apps_domain_suffix)
            .await
        {
            Ok(record) => {
                if let Some(record_id) = record.id {
                    if let Ok(updated) =
                        db::domains::set_dns_record(&state.db, created.id, &record_id).await
                    {
                        created = updated;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(domain = %created.domain, "failed to create DNS record: {err}");
            }
        }
    }

    let ip = Some(client_ip);
    activity::record(
        &state,
        user.user_id,
        Some(app.id),
        "domain.add",
        Some(serde_json::json!({ "domain": created.domain })),
        ip,
    )
    .await;

    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    get,
    path = "/api/apps/{name}/domains/{domain}",
    tag = "domains",
    params(
        ("name" = String, Path, description = "App name"),
        ("domain" = String, Path, description = "Hostname")
    ),
    responses(
        (status = 200, description = "Domain detail", body = DomainResponse),
        (status = 404, description = "Unknown app or domain")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "GET /api/apps/{name}/domains/{domain}", skip(state, user))]
pub async fn get_domain(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((name, domain_name)): Path<(String, String)>,
) -> Result<Json<DomainResponse>, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;
    let found = fetch_app_domain(&state, app.id, &domain_name).await?;
    Ok(Json(found.into()))
}

#[utoipa::path(
    delete,
    path = "/api/apps/{name}/domains/{domain}",
    tag = "domains",
    params(
        ("name" = String, Path, description = "App name"),
        ("domain" = String, Path, description = "Hostname")
    ),
    responses(
        (status = 204, description = "Domain removed"),
        (status = 404, description = "Unknown app or domain")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "DELETE /api/apps/{name}/domains/{domain}", skip(state, user))]
pub async fn remove_domain(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Path((name, domain_name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;
    let found = fetch_app_domain(&state, app.id, &domain_name).await?;

    // Best-effort provider cleanup; the row goes away regardless.
    if let (Some(dns_client), Some(record_id)) = (&state.dns, &found.dns_record_id) {
        if let Err(err) = dns_client.delete_record(record_id).await {
            tracing::warn!(domain = %found.domain, "failed to delete DNS record: {err}");
        }
    }

    db::domains::delete(&state.db, found.id).await?;

    let ip = Some(client_ip);
    activity::record(
        &state,
        user.user_id,
        Some(app.id),
        "domain.remove",
        Some(serde_json::json!({ "domain": found.domain })),
        ip,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/apps/{name}/domains/{domain}/verify",
    tag = "domains",
    params(
        ("name" = String, Path, description = "App name"),
        ("domain" = String, Path, description = "Hostname")
    ),
    responses(
        (status = 200, description = "Verification outcome", body = VerifyResponse),
        (status = 404, description = "Unknown app or domain")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "POST /api/apps/{name}/domains/{domain}/verify", skip(state, user))]
pub async fn verify_domain(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    Path((name, domain_name)): Path<(String, String)>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;
    let found = fetch_app_domain(&state, app.id, &domain_name).await?;

    if found.verified {
        return Ok(Json(VerifyResponse {
            domain: found.domain,
            verified: true,
            verified_at: found.verified_at,
            message: "domain already verified".to_string(),
        }));
    }

    let expected_target = &state.config.apps_domain_suffix;
    let verified = check_cname(&state, &found.domain, expected_target).await;

    if !verified {
        return Ok(Json(VerifyResponse {
            domain: found.domain,
            verified: false,
            verified_at: None,
            message: format!(
                "DNS verification failed, please ensure a CNAME record points to {expected_target}"
            ),
        }));
    }

    let updated = db::domains::mark_verified(&state.db, found.id).await?;

    let ip = Some(client_ip);
    activity::record(
        &state,
        user.user_id,
        Some(app.id),
        "domain.verify",
        Some(serde_json::json!({ "domain": updated.domain })),
        ip,
    )
    .await;

    Ok(Json(VerifyResponse {
        domain: updated.domain,
        verified: true,
        verified_at: updated.verified_at,
        message: "domain verified successfully".to_string(),
    }))
}

/// Provider API first; when the zone does not carry the record (or no
/// provider is configured), fall back to system resolution.
async fn check_cname(state: &AppState, domain_name: &str, expected: &str) -> bool {
    if let Some(dns_client) = &state.dns {
        match dns_client.verify_domain(domain_name, expected).await {
            Ok(result) if result.verified => return true,
            _ => {}
        }
    }

    dns::resolve_cname_matches(domain_name, expected)
        .await
        .unwrap_or(false)
}

async fn fetch_app_domain(
    state: &AppState,
    app_id: Uuid,
    domain_name: &str,
) -> Result<domain::Model, ApiError> {
    let found = db::domains::get_by_name(&state.db, domain_name)
        .await?
        .ok_or_else(|| ApiError::not_found("domain not found"))?;

    if found.app_id != app_id {
        return Err(ApiError::not_found("domain not found"));
    }
    Ok(found)
}
