//! Shared application state: the dependency container constructed once at
//! bootstrap and handed to every handler.

use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::auth::github::GitHubClient;
use crate::config::Config;
use crate::deploy::DeployLocks;
use crate::dns::DnsClient;
use crate::kubernetes::ClusterClient;
use crate::middleware::rate_limit::RateLimiter;

pub type AppState = Arc<State>;

pub struct State {
    pub config: Config,
    pub db: DatabaseConnection,
    pub kube: Option<ClusterClient>,
    pub dns: Option<DnsClient>,
    pub deploy_locks: DeployLocks,
    pub limiter: RateLimiter,
}

impl State {
    /// Wire up the container. Cluster and DNS drivers are optional: missing
    /// credentials disable the feature, not the process.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let mut opt = ConnectOptions::new(config.database_url.clone());
        opt.max_connections(10)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .sqlx_logging(config.is_development());

        let db = Database::connect(opt).await?;

        let kube = if !config.kubeconfig.is_empty()
            || std::env::var("KUBERNETES_SERVICE_HOST").is_ok()
        {
            match ClusterClient::new(&config.kubeconfig, &config.k8s_namespace_prefix).await {
                Ok(client) => {
                    tracing::info!("connected to kubernetes");
                    Some(client)
                }
                Err(err) => {
                    tracing::warn!("kubernetes not available: {err}");
                    None
                }
            }
        } else {
            None
        };

        let dns = if !config.cloudflare_api_token.is_empty()
            && !config.cloudflare_zone_id.is_empty()
        {
            tracing::info!("cloudflare client initialized");
            Some(DnsClient::new(
                &config.cloudflare_api_token,
                &config.cloudflare_zone_id,
            ))
        } else {
            None
        };

        Ok(Self {
            config,
            db,
            kube,
            dns,
            deploy_locks: DeployLocks::new(),
            limiter: RateLimiter::default(),
        })
    }

    /// GitHub OAuth client, when credentials are configured.
    pub fn github_client(&self) -> Option<GitHubClient> {
        if self.config.github_client_id.is_empty() || self.config.github_client_secret.is_empty() {
            return None;
        }
        Some(GitHubClient::new(
            &self.config.github_client_id,
            &self.config.github_client_secret,
            &self.config.github_callback_url,
        ))
    }
}
