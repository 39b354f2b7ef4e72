//! Router-level tests against a mock database: middleware stack,
//! validation ordering and the public/authenticated split.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use tower::ServiceExt;
use uuid::Uuid;

use nexo_api::auth::jwt::generate_token_pair;
use nexo_api::config::Config;
use nexo_api::construct_router;
use nexo_api::deploy::DeployLocks;
use nexo_api::entity::user;
use nexo_api::middleware::rate_limit::RateLimiter;
use nexo_api::state::{AppState, State};

const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

fn test_config() -> Config {
    Config {
        port: 3000,
        host: "127.0.0.1".to_string(),
        environment: "development".to_string(),
        database_url: String::new(),
        github_client_id: String::new(),
        github_client_secret: String::new(),
        github_callback_url: String::new(),
        jwt_secret: JWT_SECRET.to_string(),
        encryption_key: "0123456789abcdef0123456789abcdef".to_string(),
        kubeconfig: String::new(),
        k8s_namespace_prefix: "tenant-".to_string(),
        cloudflare_api_token: String::new(),
        cloudflare_zone_id: String::new(),
        platform_domain: "cloud.nexo.build".to_string(),
        apps_domain_suffix: "nexo.build".to_string(),
        cors_origins: vec!["http://localhost:3000".to_string()],
    }
}

fn test_state(db: DatabaseConnection) -> AppState {
    Arc::new(State {
        config: test_config(),
        db,
        kube: None,
        dns: None,
        deploy_locks: DeployLocks::new(),
        limiter: RateLimiter::default(),
    })
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn bearer(user_id: Uuid) -> String {
    let pair = generate_token_pair(user_id, "octocat", JWT_SECRET).unwrap();
    format!("Bearer {}", pair.access_token)
}

#[tokio::test]
async fn unauthenticated_request_is_rejected() {
    let router = construct_router(test_state(empty_db()));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/apps")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn security_headers_are_applied() {
    let router = construct_router(test_state(empty_db()));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/apps")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-xss-protection").unwrap(), "1; mode=block");
    assert_eq!(
        headers.get("referrer-policy").unwrap(),
        "strict-origin-when-cross-origin"
    );
    assert_eq!(
        headers.get("content-security-policy").unwrap(),
        "default-src 'none'; frame-ancestors 'none'"
    );
}

#[tokio::test]
async fn request_id_is_propagated() {
    let router = construct_router(test_state(empty_db()));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/apps")
                .header("x-request-id", "test-request-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "test-request-42"
    );
}

#[tokio::test]
async fn request_id_is_generated_when_absent() {
    let router = construct_router(test_state(empty_db()));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/apps")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let id = response.headers().get("x-request-id").unwrap();
    assert!(!id.to_str().unwrap().is_empty());
}

#[tokio::test]
async fn preflight_short_circuits_with_204() {
    let router = construct_router(test_state(empty_db()));
    let response = router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/apps")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn disallowed_origin_gets_no_cors_headers() {
    let router = construct_router(test_state(empty_db()));
    let response = router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/apps")
                .header(header::ORIGIN, "http://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn scale_bounds_are_rejected_before_any_lookup() {
    let router = construct_router(test_state(empty_db()));

    for replicas in ["-1", "11"] {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/apps/myapp/scale")
                    .header(header::AUTHORIZATION, bearer(Uuid::new_v4()))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!(r#"{{"replicas":{replicas}}}"#)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "replicas {replicas} should be rejected"
        );
    }
}

#[tokio::test]
async fn invalid_app_name_is_rejected_before_any_lookup() {
    let router = construct_router(test_state(empty_db()));
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/apps")
                .header(header::AUTHORIZATION, bearer(Uuid::new_v4()))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"MyApp"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_domain_is_rejected_before_any_lookup() {
    let router = construct_router(test_state(empty_db()));
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/apps/myapp/domains")
                .header(header::AUTHORIZATION, bearer(Uuid::new_v4()))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"domain":"https://example.com"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rapid_fire_requests_hit_the_rate_limit() {
    let router = construct_router(test_state(empty_db()));

    let mut limited = None;
    for _ in 0..300 {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/apps")
                    .header("x-forwarded-for", "203.0.113.50")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            limited = Some(response);
            break;
        }
    }

    let response = limited.expect("expected at least one 429 within 300 requests");
    assert_eq!(response.headers().get("retry-after").unwrap(), "1");
}

#[tokio::test]
async fn users_me_returns_the_profile() {
    let user_id = Uuid::new_v4();
    let now = Utc::now();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user::Model {
            id: user_id,
            github_id: 12345,
            username: "octocat".to_string(),
            email: "octocat@example.com".to_string(),
            avatar_url: None,
            plan: "free".to_string(),
            created_at: now,
            updated_at: now,
        }]])
        .into_connection();

    let router = construct_router(test_state(db));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/users/me")
                .header(header::AUTHORIZATION, bearer(user_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["username"], "octocat");
    assert_eq!(json["email"], "octocat@example.com");
    assert_eq!(json["plan"], "free");
}

#[tokio::test]
async fn expired_session_token_is_rejected() {
    let router = construct_router(test_state(empty_db()));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/apps")
                .header(header::AUTHORIZATION, "Bearer not-a-real-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
