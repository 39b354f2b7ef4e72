//! Rollout orchestration: versioned deployment records driven through
//! `pending -> deploying -> running | failed`, with at most one concurrent
//! apply per app.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::db;
use crate::entity::{app, deployment};
use crate::error::ApiError;
use crate::state::AppState;

/// Container port the platform routes traffic to.
pub const DEFAULT_PORT: i32 = 8080;
pub const DEFAULT_REPLICAS: i32 = 1;

/// Per-app apply serialization. Locks are created on demand and retained
/// for the process lifetime; readers never touch this map.
#[derive(Default)]
pub struct DeployLocks {
    inner: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl DeployLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_app(&self, app_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().expect("deploy lock map poisoned");
        map.entry(app_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Insert a `pending` deployment with the next version for the app.
pub async fn create_deployment(
    db: &DatabaseConnection,
    app: &app::Model,
    image: &str,
) -> Result<deployment::Model, ApiError> {
    Ok(db::deployments::create_next_version(db, app.id, image).await?)
}

/// A rollback is a new, higher-versioned deployment carrying the image of
/// a prior one.
pub async fn rollback(
    db: &DatabaseConnection,
    app: &app::Model,
    prior: &deployment::Model,
) -> Result<deployment::Model, ApiError> {
    Ok(db::deployments::create_next_version(db, app.id, &prior.image).await?)
}

/// Drive a deployment through the cluster and land its record in a
/// terminal state. The app's status mirrors the outcome.
///
/// Intended to run on a spawned task after the HTTP handler has already
/// answered with the `pending` row.
pub async fn apply_deployment(state: AppState, app: app::Model, deployment: deployment::Model) {
    let Some(kube) = state.kube.clone() else {
        tracing::warn!(app = %app.name, "kubernetes not configured, deployment stays pending");
        return;
    };

    // At most one concurrent apply per app.
    let lock = state.deploy_locks.for_app(app.id);
    let _guard = lock.lock().await;

    if let Err(err) = db::deployments::mark_deploying(&state.db, deployment.id).await {
        tracing::error!(app = %app.name, "failed to mark deployment deploying: {err}");
        return;
    }

    let env_vars = match &app.env_vars_encrypted {
        Some(blob) => match crate::vault::decrypt(blob, &state.config.encryption_key) {
            Ok(vars) => vars,
            Err(err) => {
                fail(&state, &app, &deployment, format!("env decryption failed: {err}")).await;
                return;
            }
        },
        None => HashMap::new(),
    };

    let domain = match db::domains::list_by_app(&state.db, app.id).await {
        Ok(domains) => domains
            .into_iter()
            .find(|d| d.verified)
            .map(|d| d.domain),
        Err(_) => None,
    };

    // A redeploy or rollback must not undo a manual scale: carry the live
    // replica count forward, defaulting only for a first rollout.
    let replicas = match kube.get_app_status(&app.name).await {
        Ok(status) => rollout_replicas(&status),
        Err(err) => {
            tracing::warn!(app = %app.name, "failed to read live replica count: {err}");
            DEFAULT_REPLICAS
        }
    };

    let spec = kube.app_spec(
        &app.name,
        &deployment.image,
        replicas,
        DEFAULT_PORT,
        env_vars,
        domain,
        &state.config.apps_domain_suffix,
    );

    match kube.deploy(&spec).await {
        Ok(result) if result.success => {
            if let Err(err) =
                db::deployments::mark_running(&state.db, deployment.id, Some(result.message), Utc::now())
                    .await
            {
                tracing::error!(app = %app.name, "failed to mark deployment running: {err}");
            }
            if let Err(err) =
                db::apps::update_status(&state.db, app.id, "running", Some(deployment.id)).await
            {
                tracing::error!(app = %app.name, "failed to update app status: {err}");
            }
            tracing::info!(app = %app.name, version = deployment.version, "deployment ready");
        }
        Ok(result) => fail(&state, &app, &deployment, result.message).await,
        Err(err) => fail(&state, &app, &deployment, err.to_string()).await,
    }
}

/// Replica count for the next rollout: the deployment's current desired
/// count when one exists, the default otherwise.
fn rollout_replicas(status: &crate::kubernetes::AppStatus) -> i32 {
    if status.status == "not_deployed" {
        DEFAULT_REPLICAS
    } else {
        status.replicas
    }
}

async fn fail(state: &AppState, app: &app::Model, deployment: &deployment::Model, error: String) {
    tracing::warn!(app = %app.name, version = deployment.version, "deployment failed: {error}");
    if let Err(err) = db::deployments::mark_failed(&state.db, deployment.id, error).await {
        tracing::error!(app = %app.name, "failed to mark deployment failed: {err}");
    }
    if let Err(err) =
        db::apps::update_status(&state.db, app.id, "failed", Some(deployment.id)).await
    {
        tracing::error!(app = %app.name, "failed to update app status: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::AppStatus;

    fn status(status: &str, replicas: i32) -> AppStatus {
        AppStatus {
            status: status.to_string(),
            replicas,
            ready_replicas: 0,
            available_replicas: 0,
        }
    }

    #[test]
    fn first_rollout_uses_the_default_replica_count() {
        assert_eq!(
            rollout_replicas(&status("not_deployed", 0)),
            DEFAULT_REPLICAS
        );
    }

    #[test]
    fn redeploy_preserves_the_live_replica_count() {
        assert_eq!(rollout_replicas(&status("running", 3)), 3);
        assert_eq!(rollout_replicas(&status("partially_ready", 5)), 5);
        assert_eq!(rollout_replicas(&status("starting", 2)), 2);
    }

    #[test]
    fn scaled_to_zero_stays_at_zero() {
        assert_eq!(rollout_replicas(&status("unknown", 0)), 0);
    }

    #[test]
    fn locks_are_stable_per_app() {
        let locks = DeployLocks::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let first = locks.for_app(a);
        let second = locks.for_app(a);
        let other = locks.for_app(b);

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[tokio::test]
    async fn lock_serializes_holders() {
        let locks = DeployLocks::new();
        let app_id = Uuid::new_v4();

        let lock = locks.for_app(app_id);
        let guard = lock.lock().await;

        let contender = locks.for_app(app_id);
        assert!(contender.try_lock().is_err());

        drop(guard);
        assert!(contender.try_lock().is_ok());
    }
}
