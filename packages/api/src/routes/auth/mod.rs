use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod callback;
pub mod login;
pub mod logout;
pub mod token;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login))
        .route("/callback", get(callback::callback))
        .route("/logout", post(logout::logout))
        .route(
            "/token",
            get(token::list_tokens).post(token::create_token),
        )
        .route("/token/{id}", axum::routing::delete(token::revoke_token))
}

/// Build a `Set-Cookie` value for an auth cookie.
pub(crate) fn auth_cookie(name: &str, value: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie =
        format!("{name}={value}; Path=/; Max-Age={max_age_seconds}; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Validate a post-login redirect target: relative paths pass through,
/// absolute URLs must match the request host, anything else collapses to
/// `/`.
pub(crate) fn validate_redirect(redirect: &str, request_host: Option<&str>) -> String {
    if redirect.is_empty() {
        return "/".to_string();
    }

    if let Some(rest) = redirect.split("://").nth(1) {
        let host = rest.split('/').next().unwrap_or("");
        match request_host {
            Some(expected) if host.eq_ignore_ascii_case(expected) => redirect.to_string(),
            _ => "/".to_string(),
        }
    } else if redirect.starts_with('/') {
        redirect.to_string()
    } else {
        "/".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_attributes() {
        let cookie = auth_cookie("access_token", "tok", 900, false);
        assert!(cookie.starts_with("access_token=tok; "));
        assert!(cookie.contains("Max-Age=900"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));

        let secure = auth_cookie("refresh_token", "tok", 600, true);
        assert!(secure.ends_with("; Secure"));
    }

    #[test]
    fn relative_redirects_pass() {
        assert_eq!(validate_redirect("/dashboard", Some("nexo.build")), "/dashboard");
        assert_eq!(validate_redirect("", Some("nexo.build")), "/");
    }

    #[test]
    fn cross_origin_redirects_collapse() {
        assert_eq!(
            validate_redirect("https://evil.example/", Some("nexo.build")),
            "/"
        );
        assert_eq!(
            validate_redirect("https://nexo.build/apps", Some("nexo.build")),
            "https://nexo.build/apps"
        );
        assert_eq!(validate_redirect("https://nexo.build/apps", None), "/");
        assert_eq!(validate_redirect("javascript:alert(1)", Some("x")), "/");
    }
}
