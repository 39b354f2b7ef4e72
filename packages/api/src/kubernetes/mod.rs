//! Cluster driver: translates an [`AppSpec`] into namespace, secret,
//! deployment, service and ingress objects and reconciles them
//! idempotently against the cluster.

mod client;
mod deploy;
mod logs;
mod manifests;
mod metrics;

pub use client::ClusterClient;
pub use deploy::{AppStatus, DeployResult, MAX_REPLICAS, MIN_REPLICAS};
pub use logs::{LogLine, LogStreamOptions};
pub use manifests::AppSpec;
pub use metrics::{AppMetrics, PodMetrics};
