//! Idempotent apply of an [`AppSpec`] and day-two operations (scale,
//! restart, status, delete).
//!
//! Each resource is reconciled with a GET-then-UPDATE-or-CREATE round
//! trip; server-assigned fields (resource version, cluster IP) are carried
//! over on update. There is no rollback across resources — a partial
//! failure leaves objects in place for the next, idempotent, attempt.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Pod, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{DeleteParams, ListParams, ObjectList, PostParams};
use kube::Api;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::client::{is_not_found, ClusterClient};
use super::manifests::{
    AppSpec, generate_deployment, generate_ingress, generate_namespace, generate_secret,
    generate_service, pod_selector,
};
use crate::error::ApiError;

const READINESS_POLL_INTERVAL: Duration = Duration::from_secs(2);
const READINESS_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default deadline for one-shot cluster operations without a caller
/// supplied one.
const OP_DEADLINE: Duration = Duration::from_secs(120);

pub const MIN_REPLICAS: i32 = 0;
pub const MAX_REPLICAS: i32 = 10;

const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

/// Outcome of a full apply + readiness wait.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DeployResult {
    pub success: bool,
    pub message: String,
    pub namespace: String,
    pub url: String,
}

/// Live rollout state of an app, read through from the cluster.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AppStatus {
    pub status: String,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub available_replicas: i32,
}

impl ClusterClient {
    /// Apply all five resources in order, then wait for readiness.
    ///
    /// A readiness timeout is not an error: the partial state stays in
    /// place and the result reports `success: false`.
    pub async fn deploy(&self, spec: &AppSpec) -> Result<DeployResult, ApiError> {
        self.ensure_namespace(spec).await?;
        self.apply_secret(spec).await?;
        self.apply_deployment(spec).await?;
        self.apply_service(spec).await?;
        self.apply_ingress(spec).await?;

        if let Err(err) = self.wait_for_deployment(spec).await {
            return Ok(DeployResult {
                success: false,
                message: format!("deployment did not become ready: {err}"),
                namespace: spec.namespace.clone(),
                url: String::new(),
            });
        }

        Ok(DeployResult {
            success: true,
            message: "deployment successful".to_string(),
            namespace: spec.namespace.clone(),
            url: spec.url(),
        })
    }

    async fn ensure_namespace(&self, spec: &AppSpec) -> Result<(), ApiError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        match api.get(&spec.namespace).await {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => {
                api.create(&PostParams::default(), &generate_namespace(spec))
                    .await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_secret(&self, spec: &AppSpec) -> Result<(), ApiError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &spec.namespace);
        let mut secret = generate_secret(spec);
        let name = spec.secret_name();

        match api.get(&name).await {
            Ok(existing) => {
                secret.metadata.resource_version = existing.metadata.resource_version;
                api.replace(&name, &PostParams::default(), &secret).await?;
                Ok(())
            }
            Err(err) if is_not_found(&err) => {
                api.create(&PostParams::default(), &secret).await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_deployment(&self, spec: &AppSpec) -> Result<(), ApiError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &spec.namespace);
        let mut deployment = generate_deployment(spec);

        match api.get(&spec.name).await {
            Ok(existing) => {
                deployment.metadata.resource_version = existing.metadata.resource_version;
                api.replace(&spec.name, &PostParams::default(), &deployment)
                    .await?;
                Ok(())
            }
            Err(err) if is_not_found(&err) => {
                api.create(&PostParams::default(), &deployment).await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_service(&self, spec: &AppSpec) -> Result<(), ApiError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), &spec.namespace);
        let mut service = generate_service(spec);

        match api.get(&spec.name).await {
            Ok(existing) => {
                service.metadata.resource_version = existing.metadata.resource_version;
                // ClusterIP is immutable and server-assigned.
                if let (Some(desired), Some(observed)) =
                    (service.spec.as_mut(), existing.spec.as_ref())
                {
                    desired.cluster_ip = observed.cluster_ip.clone();
                }
                api.replace(&spec.name, &PostParams::default(), &service)
                    .await?;
                Ok(())
            }
            Err(err) if is_not_found(&err) => {
                api.create(&PostParams::default(), &service).await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_ingress(&self, spec: &AppSpec) -> Result<(), ApiError> {
        let api: Api<Ingress> = Api::namespaced(self.client.clone(), &spec.namespace);
        let mut ingress = generate_ingress(spec);

        match api.get(&spec.name).await {
            Ok(existing) => {
                ingress.metadata.resource_version = existing.metadata.resource_version;
                api.replace(&spec.name, &PostParams::default(), &ingress)
                    .await?;
                Ok(())
            }
            Err(err) if is_not_found(&err) => {
                api.create(&PostParams::default(), &ingress).await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Poll the deployment every 2 s for up to 5 minutes, succeeding when
    /// `status.readyReplicas >= spec.replicas`.
    async fn wait_for_deployment(&self, spec: &AppSpec) -> Result<(), ApiError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &spec.namespace);
        let deadline = tokio::time::Instant::now() + READINESS_TIMEOUT;

        loop {
            if let Ok(deployment) = api.get(&spec.name).await {
                let desired = deployment
                    .spec
                    .as_ref()
                    .and_then(|s| s.replicas)
                    .unwrap_or(0);
                let ready = deployment
                    .status
                    .as_ref()
                    .and_then(|s| s.ready_replicas)
                    .unwrap_or(0);
                if ready >= desired {
                    return Ok(());
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(ApiError::internal("timed out waiting for ready replicas"));
            }
            tokio::time::sleep(READINESS_POLL_INTERVAL).await;
        }
    }

    /// Delete the app's namespace; the cluster garbage-collects the rest.
    pub async fn delete_app(&self, app_name: &str) -> Result<(), ApiError> {
        let namespace = self.namespace_for_app(app_name);
        let api: Api<Namespace> = Api::all(self.client.clone());
        match with_deadline(api.delete(&namespace, &DeleteParams::default())).await? {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Set the deployment's replica count. Bounds are validated before any
    /// cluster round trip.
    pub async fn scale_app(&self, app_name: &str, replicas: i32) -> Result<(), ApiError> {
        if !(MIN_REPLICAS..=MAX_REPLICAS).contains(&replicas) {
            return Err(ApiError::bad_request(format!(
                "replicas must be between {MIN_REPLICAS} and {MAX_REPLICAS}"
            )));
        }

        let namespace = self.namespace_for_app(app_name);
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &namespace);

        let mut deployment = with_deadline(api.get(app_name)).await??;
        if let Some(spec) = deployment.spec.as_mut() {
            spec.replicas = Some(replicas);
        }
        with_deadline(api.replace(app_name, &PostParams::default(), &deployment)).await??;
        Ok(())
    }

    /// Trigger a rollout restart by stamping the pod template.
    pub async fn restart_app(&self, app_name: &str) -> Result<(), ApiError> {
        let namespace = self.namespace_for_app(app_name);
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &namespace);

        let mut deployment = with_deadline(api.get(app_name)).await??;
        if let Some(spec) = deployment.spec.as_mut() {
            let metadata = spec.template.metadata.get_or_insert_with(Default::default);
            metadata
                .annotations
                .get_or_insert_with(BTreeMap::new)
                .insert(RESTARTED_AT_ANNOTATION.to_string(), Utc::now().to_rfc3339());
        }
        with_deadline(api.replace(app_name, &PostParams::default(), &deployment)).await??;
        Ok(())
    }

    /// Map the deployment's replica counters to a coarse app status.
    pub async fn get_app_status(&self, app_name: &str) -> Result<AppStatus, ApiError> {
        let namespace = self.namespace_for_app(app_name);
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &namespace);

        let deployment = match with_deadline(api.get(app_name)).await? {
            Ok(d) => d,
            Err(err) if is_not_found(&err) => {
                return Ok(AppStatus {
                    status: "not_deployed".to_string(),
                    replicas: 0,
                    ready_replicas: 0,
                    available_replicas: 0,
                });
            }
            Err(err) => return Err(err.into()),
        };

        let desired = deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(0);
        let status = deployment.status.as_ref();
        let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
        let available = status.and_then(|s| s.available_replicas).unwrap_or(0);

        Ok(AppStatus {
            status: classify_status(desired, ready).to_string(),
            replicas: desired,
            ready_replicas: ready,
            available_replicas: available,
        })
    }

    pub(super) async fn get_pods(&self, app_name: &str) -> Result<ObjectList<Pod>, ApiError> {
        let namespace = self.namespace_for_app(app_name);
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &namespace);
        let params = ListParams::default().labels(&pod_selector(app_name));
        Ok(with_deadline(api.list(&params)).await??)
    }

    /// Build the spec for an app in its tenant namespace.
    pub fn app_spec(
        &self,
        name: &str,
        image: &str,
        replicas: i32,
        port: i32,
        env_vars: std::collections::HashMap<String, String>,
        domain: Option<String>,
        domain_suffix: &str,
    ) -> AppSpec {
        AppSpec {
            name: name.to_string(),
            namespace: self.namespace_for_app(name),
            image: image.to_string(),
            replicas,
            port,
            env_vars,
            domain,
            domain_suffix: domain_suffix.to_string(),
        }
    }
}

fn classify_status(desired: i32, ready: i32) -> &'static str {
    if ready == desired && ready > 0 {
        "running"
    } else if ready > 0 && ready < desired {
        "partially_ready"
    } else if ready == 0 && desired > 0 {
        "starting"
    } else {
        "unknown"
    }
}

async fn with_deadline<T>(
    fut: impl std::future::Future<Output = Result<T, kube::Error>>,
) -> Result<Result<T, kube::Error>, ApiError> {
    tokio::time::timeout(OP_DEADLINE, fut)
        .await
        .map_err(|_| ApiError::internal("cluster operation timed out"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_matrix() {
        assert_eq!(classify_status(3, 3), "running");
        assert_eq!(classify_status(1, 1), "running");
        assert_eq!(classify_status(3, 1), "partially_ready");
        assert_eq!(classify_status(3, 0), "starting");
        assert_eq!(classify_status(0, 0), "unknown");
    }

    #[test]
    fn scale_bounds_are_inclusive() {
        assert!((MIN_REPLICAS..=MAX_REPLICAS).contains(&0));
        assert!((MIN_REPLICAS..=MAX_REPLICAS).contains(&10));
        assert!(!(MIN_REPLICAS..=MAX_REPLICAS).contains(&-1));
        assert!(!(MIN_REPLICAS..=MAX_REPLICAS).contains(&11));
    }
}
