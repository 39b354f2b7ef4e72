use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderName, StatusCode, header};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

pub mod activity;
pub mod auth;
pub mod config;
pub mod db;
pub mod deploy;
pub mod dns;
pub mod entity;
pub mod error;
pub mod kubernetes;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod vault;

use middleware::auth::auth_middleware;
use middleware::cors::cors_middleware;
use middleware::rate_limit::rate_limit_middleware;
use middleware::security_headers::security_headers_middleware;
use state::AppState;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

pub fn default_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info")
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("hyper_util=warn".parse().unwrap())
            .add_directive("rustls=warn".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("h2=warn".parse().unwrap())
    })
}

/// Build the full router with the middleware stack applied
/// outermost-in as: recovery, request-id, logging, security headers,
/// rate limit, CORS, auth.
pub fn construct_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/health", routes::health::routes())
        .nest("/auth", routes::auth::routes())
        .nest("/users", routes::users::routes())
        .nest("/apps", routes::apps::routes())
        .route("/openapi.json", get(openapi_json))
        .with_state(state.clone());

    Router::new()
        .nest("/api", api)
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(from_fn_with_state(state.clone(), cors_middleware))
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(&REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .layer(CatchPanicLayer::custom(handle_panic))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!("panic recovered: {detail}");

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"error":"internal server error"}"#))
        .unwrap_or_default()
}
