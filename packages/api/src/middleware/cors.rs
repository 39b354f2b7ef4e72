//! CORS with a per-origin allow-list; `*` in the list means allow-all.
//! Preflight requests short-circuit with `204 No Content`.

use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Authorization, Content-Type, X-Request-ID";
const MAX_AGE: &str = "86400";

pub async fn cors_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let allowed = match &origin {
        Some(origin) => origin_allowed(&state.config.cors_origins, origin),
        None => false,
    };

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        if allowed {
            apply_headers(&mut response, origin.as_deref().unwrap_or_default());
        }
        return response;
    }

    let mut response = next.run(request).await;
    if allowed {
        apply_headers(&mut response, origin.as_deref().unwrap_or_default());
    }
    response
}

fn origin_allowed(allow_list: &[String], origin: &str) -> bool {
    allow_list.is_empty()
        || allow_list.iter().any(|o| o == "*")
        || allow_list.iter().any(|o| o == origin)
}

fn apply_headers(response: &mut Response, origin: &str) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(MAX_AGE),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_membership() {
        let list = vec!["http://localhost:3000".to_string()];
        assert!(origin_allowed(&list, "http://localhost:3000"));
        assert!(!origin_allowed(&list, "http://evil.example"));
    }

    #[test]
    fn wildcard_allows_everything() {
        let list = vec!["*".to_string()];
        assert!(origin_allowed(&list, "http://anything.example"));
    }

    #[test]
    fn empty_list_allows_everything() {
        assert!(origin_allowed(&[], "http://anything.example"));
    }
}
