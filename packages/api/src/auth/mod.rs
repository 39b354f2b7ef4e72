//! Authentication primitives shared by the middleware stack and handlers.

use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use uuid::Uuid;

pub mod github;
pub mod jwt;

pub use jwt::{Claims, TokenPair};

/// The resolved request principal, inserted as a request extension by the
/// auth middleware.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub principal: Principal,
}

/// How the principal authenticated.
#[derive(Clone, Debug)]
pub enum Principal {
    /// A session JWT; carries its claims.
    Session(Claims),
    /// An opaque API token; carries the token row id.
    ApiToken(Uuid),
}

/// Paths that are reachable without credentials, including descendants.
pub fn is_public_path(path: &str) -> bool {
    const PUBLIC_PATHS: [&str; 3] = ["/api/health", "/api/auth/login", "/api/auth/callback"];
    PUBLIC_PATHS
        .iter()
        .any(|p| path == *p || path.starts_with(&format!("{p}/")))
}

/// Extract a bearer credential from the `Authorization` header
/// (case-insensitive scheme), falling back to the `access_token` cookie.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        let mut parts = value.splitn(2, ' ');
        if let (Some(scheme), Some(token)) = (parts.next(), parts.next()) {
            if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
                return Some(token.trim().to_string());
            }
        }
    }

    cookie_value(headers, "access_token")
}

/// Read a single cookie value from the `Cookie` header.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        if parts.next() == Some(name) {
            let value = parts.next().unwrap_or("");
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: axum::http::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn public_paths_cover_descendants() {
        assert!(is_public_path("/api/health"));
        assert!(is_public_path("/api/auth/login"));
        assert!(is_public_path("/api/auth/callback"));
        assert!(is_public_path("/api/auth/callback/extra"));
        assert!(!is_public_path("/api/apps"));
        assert!(!is_public_path("/api/auth/token"));
        assert!(!is_public_path("/api/healthcheck"));
    }

    #[test]
    fn bearer_extraction_is_case_insensitive() {
        let headers = headers_with(AUTHORIZATION, "Bearer tok123");
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("tok123"));

        let headers = headers_with(AUTHORIZATION, "bearer tok123");
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("tok123"));

        let headers = headers_with(AUTHORIZATION, "Basic tok123");
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn falls_back_to_access_token_cookie() {
        let headers = headers_with(COOKIE, "other=1; access_token=tok456; foo=bar");
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("tok456"));
    }

    #[test]
    fn header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer fromheader"));
        headers.insert(COOKIE, HeaderValue::from_static("access_token=fromcookie"));
        assert_eq!(
            extract_bearer_token(&headers).as_deref(),
            Some("fromheader")
        );
    }

    #[test]
    fn missing_everything_yields_none() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
