//! Environment-driven configuration.
//!
//! Every option has a default; unknown environment keys are ignored.
//! Missing cluster or DNS credentials disable that driver rather than
//! failing startup.

/// Runtime configuration resolved once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub environment: String,

    pub database_url: String,

    pub github_client_id: String,
    pub github_client_secret: String,
    pub github_callback_url: String,

    pub jwt_secret: String,
    pub encryption_key: String,

    pub kubeconfig: String,
    pub k8s_namespace_prefix: String,

    pub cloudflare_api_token: String,
    pub cloudflare_zone_id: String,

    pub platform_domain: String,
    pub apps_domain_suffix: String,

    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        let platform_domain = get_env("PLATFORM_DOMAIN", "cloud.nexo.build");
        let cors_origins = vec![
            "http://localhost:3000".to_string(),
            "http://localhost:5173".to_string(),
            format!("https://{platform_domain}"),
        ];

        Self {
            port: get_env_parsed("PORT", 3000),
            host: get_env("HOST", "0.0.0.0"),
            environment: get_env("ENVIRONMENT", "development"),

            database_url: get_env(
                "DATABASE_URL",
                "postgres://postgres@localhost:5432/nexo?sslmode=disable",
            ),

            github_client_id: get_env("GITHUB_CLIENT_ID", ""),
            github_client_secret: get_env("GITHUB_CLIENT_SECRET", ""),
            github_callback_url: get_env(
                "GITHUB_CALLBACK_URL",
                "http://localhost:3000/api/auth/callback",
            ),

            jwt_secret: get_env("JWT_SECRET", ""),
            encryption_key: get_env("ENCRYPTION_KEY", ""),

            kubeconfig: get_env("KUBECONFIG", ""),
            k8s_namespace_prefix: get_env("K8S_NAMESPACE_PREFIX", "tenant-"),

            cloudflare_api_token: get_env("CLOUDFLARE_API_TOKEN", ""),
            cloudflare_zone_id: get_env("CLOUDFLARE_ZONE_ID", ""),

            platform_domain,
            apps_domain_suffix: get_env("APPS_DOMAIN_SUFFIX", "nexo.build"),

            cors_origins,
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn get_env(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn get_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        // Scoped env names so parallel tests cannot interfere.
        std::env::remove_var("NEXO_TEST_UNSET");
        assert_eq!(get_env("NEXO_TEST_UNSET", "fallback"), "fallback");
        assert_eq!(get_env_parsed::<u16>("NEXO_TEST_UNSET", 3000), 3000);
    }

    #[test]
    fn empty_string_falls_back() {
        std::env::set_var("NEXO_TEST_EMPTY", "");
        assert_eq!(get_env("NEXO_TEST_EMPTY", "fallback"), "fallback");
        std::env::remove_var("NEXO_TEST_EMPTY");
    }

    #[test]
    fn invalid_numeric_falls_back() {
        std::env::set_var("NEXO_TEST_PORT", "not-a-number");
        assert_eq!(get_env_parsed::<u16>("NEXO_TEST_PORT", 3000), 3000);
        std::env::set_var("NEXO_TEST_PORT", "8080");
        assert_eq!(get_env_parsed::<u16>("NEXO_TEST_PORT", 3000), 8080);
        std::env::remove_var("NEXO_TEST_PORT");
    }
}
