//! Cluster client bootstrap.
//!
//! Uses the configured kubeconfig path when present, otherwise falls back
//! to the `KUBECONFIG` environment variable, the default kubeconfig
//! location and finally in-cluster credentials.

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

/// Handle on the cluster plus the tenant namespace convention.
#[derive(Clone)]
pub struct ClusterClient {
    pub(super) client: Client,
    namespace_prefix: String,
}

impl ClusterClient {
    pub async fn new(kubeconfig: &str, namespace_prefix: &str) -> anyhow::Result<Self> {
        let config = resolve_config(kubeconfig).await?;
        let client = Client::try_from(config)?;
        Ok(Self {
            client,
            namespace_prefix: namespace_prefix.to_string(),
        })
    }

    /// The tenant namespace that holds all of one app's objects.
    pub fn namespace_for_app(&self, app_name: &str) -> String {
        format!("{}{}", self.namespace_prefix, app_name)
    }

    /// Cheap liveness probe against the API server.
    pub async fn ping(&self) -> Result<(), kube::Error> {
        self.client.apiserver_version().await?;
        Ok(())
    }
}

async fn resolve_config(kubeconfig: &str) -> anyhow::Result<Config> {
    if !kubeconfig.is_empty() {
        let kc = Kubeconfig::read_from(kubeconfig)?;
        return Ok(Config::from_custom_kubeconfig(kc, &KubeConfigOptions::default()).await?);
    }

    if let Ok(path) = std::env::var("KUBECONFIG") {
        if !path.is_empty() {
            let kc = Kubeconfig::read_from(&path)?;
            return Ok(Config::from_custom_kubeconfig(kc, &KubeConfigOptions::default()).await?);
        }
    }

    if let Some(home) = std::env::var_os("HOME") {
        let default_path = std::path::Path::new(&home).join(".kube").join("config");
        if default_path.exists() {
            let kc = Kubeconfig::read_from(&default_path)?;
            return Ok(Config::from_custom_kubeconfig(kc, &KubeConfigOptions::default()).await?);
        }
    }

    Ok(Config::incluster()?)
}

/// True when the API error is a 404 for the requested object.
pub(super) fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}
