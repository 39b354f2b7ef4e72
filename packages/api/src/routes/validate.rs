//! Input validation shared by the HTTP surface. Validation is uniform and
//! precedes any side effect.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ApiError;

static APP_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]*[a-z0-9]$").expect("app name regex"));

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$")
        .expect("domain regex")
});

pub const REGIONS: [&str; 3] = ["gdl", "mex", "qro"];
pub const SIZES: [&str; 3] = ["starter", "pro", "enterprise"];

pub fn validate_app_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if name.len() < 3 || name.len() > 63 {
        return Err(ApiError::bad_request(
            "name must be between 3 and 63 characters",
        ));
    }
    if !APP_NAME_RE.is_match(name) {
        return Err(ApiError::bad_request(
            "name must start with a letter, end with a letter or number, \
             and contain only lowercase letters, numbers, and hyphens",
        ));
    }
    Ok(())
}

pub fn validate_region(region: &str) -> Result<(), ApiError> {
    if REGIONS.contains(&region) {
        Ok(())
    } else {
        Err(ApiError::bad_request("invalid region"))
    }
}

pub fn validate_size(size: &str) -> Result<(), ApiError> {
    if SIZES.contains(&size) {
        Ok(())
    } else {
        Err(ApiError::bad_request("invalid size"))
    }
}

pub fn validate_domain(domain: &str) -> Result<(), ApiError> {
    if domain.is_empty() {
        return Err(ApiError::bad_request("domain is required"));
    }
    if !DOMAIN_RE.is_match(domain) {
        return Err(ApiError::bad_request("invalid domain format"));
    }
    Ok(())
}

/// Clamp pagination parameters: limit in `[1, 100]` (default 50),
/// offset `>= 0` (default 0).
pub fn clamp_pagination(limit: Option<u64>, offset: Option<u64>) -> (u64, u64) {
    let limit = match limit {
        Some(l) if (1..=100).contains(&l) => l,
        _ => 50,
    };
    (limit, offset.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_names_accepted() {
        for name in ["myapp", "my-app-v2", "abc", "a1b"] {
            assert!(validate_app_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn app_names_rejected() {
        for name in [
            "1app",
            "-app",
            "app-",
            "MyApp",
            "my_app",
            "ab",
            "",
            &"a".repeat(64),
        ] {
            assert!(validate_app_name(name).is_err(), "{name} should be invalid");
        }
    }

    #[test]
    fn sixty_three_chars_is_the_ceiling() {
        let name = format!("a{}", "b".repeat(62));
        assert_eq!(name.len(), 63);
        assert!(validate_app_name(&name).is_ok());
    }

    #[test]
    fn region_and_size_membership() {
        assert!(validate_region("gdl").is_ok());
        assert!(validate_region("mex").is_ok());
        assert!(validate_region("qro").is_ok());
        assert!(validate_region("us-east-1").is_err());

        assert!(validate_size("starter").is_ok());
        assert!(validate_size("pro").is_ok());
        assert!(validate_size("enterprise").is_ok());
        assert!(validate_size("xl").is_err());
    }

    #[test]
    fn domains_accepted() {
        for domain in ["example.com", "api.v1.example.com", "my-app.example.com"] {
            assert!(validate_domain(domain).is_ok(), "{domain} should be valid");
        }
    }

    #[test]
    fn domains_rejected() {
        for domain in [
            "example",
            "-example.com",
            "example..com",
            "https://example.com",
            "example.com/path",
            "exa mple.com",
            "",
        ] {
            assert!(validate_domain(domain).is_err(), "{domain} should be invalid");
        }
    }

    #[test]
    fn pagination_clamps() {
        assert_eq!(clamp_pagination(None, None), (50, 0));
        assert_eq!(clamp_pagination(Some(10), Some(20)), (10, 20));
        assert_eq!(clamp_pagination(Some(0), None), (50, 0));
        assert_eq!(clamp_pagination(Some(101), None), (50, 0));
        assert_eq!(clamp_pagination(Some(100), None), (100, 0));
        assert_eq!(clamp_pagination(Some(1), None), (1, 0));
    }
}
