//! OpenAPI document aggregating every handler path.

use utoipa::OpenApi;

use crate::routes;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Nexo Cloud API",
        description = "Deployment control plane for the Nexo platform",
        version = env!("CARGO_PKG_VERSION"),
    ),
    paths(
        routes::health::health,
        routes::auth::login::login,
        routes::auth::callback::callback,
        routes::auth::logout::logout,
        routes::auth::token::create_token,
        routes::auth::token::list_tokens,
        routes::auth::token::revoke_token,
        routes::users::me,
        routes::apps::list_apps::list_apps,
        routes::apps::create_app::create_app,
        routes::apps::get_app::get_app,
        routes::apps::update_app::update_app,
        routes::apps::delete_app::delete_app,
        routes::apps::restart::restart_app,
        routes::apps::scale::scale_app,
        routes::apps::scale::get_scale,
        routes::apps::deployments::list_deployments,
        routes::apps::deployments::create_deployment,
        routes::apps::deployments::get_deployment,
        routes::apps::deployments::rollback_deployment,
        routes::apps::env_vars::get_env_vars,
        routes::apps::env_vars::update_env_vars,
        routes::apps::domains::list_domains,
        routes::apps::domains::add_domain,
        routes::apps::domains::get_domain,
        routes::apps::domains::remove_domain,
        routes::apps::domains::verify_domain,
        routes::apps::logs::get_logs,
        routes::apps::activity::get_activity,
        routes::apps::metrics::get_metrics,
    ),
    tags(
        (name = "health", description = "Liveness and dependency status"),
        (name = "auth", description = "OAuth login, session and API tokens"),
        (name = "users", description = "User profile"),
        (name = "apps", description = "Application lifecycle"),
        (name = "deployments", description = "Versioned rollouts"),
        (name = "env", description = "Environment variables"),
        (name = "domains", description = "Custom domains and TLS"),
        (name = "logs", description = "Pod log access"),
        (name = "activity", description = "Audit trail"),
        (name = "metrics", description = "Resource metrics"),
    )
)]
pub struct ApiDoc;
