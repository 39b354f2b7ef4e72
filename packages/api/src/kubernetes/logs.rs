//! Per-pod log streaming with fan-in to a single bounded channel.
//!
//! One producer task per pod; frames from a single pod keep their source
//! order, frames across pods interleave arbitrarily. Producers block on a
//! full channel rather than dropping lines, and exit when the consumer
//! goes away. The channel closes once every producer has finished.

use futures_util::{AsyncBufReadExt, TryStreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::LogParams;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use utoipa::ToSchema;

use super::client::ClusterClient;
use crate::error::ApiError;

/// A single log line tagged with its source pod.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LogLine {
    pub pod: String,
    pub message: String,
}

/// Options for a log stream.
#[derive(Clone, Copy, Debug)]
pub struct LogStreamOptions {
    pub follow: bool,
    pub tail_lines: i64,
    pub timestamps: bool,
}

impl ClusterClient {
    /// Open one log stream per pod of the app and fan lines into `tx`.
    ///
    /// Returns once all producers are spawned; the channel closes when the
    /// last producer finishes. Zero pods is a client error.
    pub async fn stream_logs(
        &self,
        app_name: &str,
        opts: LogStreamOptions,
        tx: mpsc::Sender<LogLine>,
    ) -> Result<(), ApiError> {
        let namespace = self.namespace_for_app(app_name);
        let pods = self.get_pods(app_name).await?;

        if pods.items.is_empty() {
            return Err(ApiError::not_found(format!(
                "no pods found for app {app_name}"
            )));
        }

        for pod in pods.items {
            let Some(pod_name) = pod.metadata.name.clone() else {
                continue;
            };
            let api: Api<Pod> = Api::namespaced(self.client.clone(), &namespace);
            let tx = tx.clone();

            tokio::spawn(async move {
                if let Err(err) = stream_pod_logs(api, &pod_name, opts, tx).await {
                    tracing::warn!(pod = %pod_name, "log stream ended: {err}");
                }
            });
        }

        Ok(())
    }

    /// Collect the last `tail_lines` lines of every pod of the app.
    pub async fn get_recent_logs(
        &self,
        app_name: &str,
        tail_lines: i64,
    ) -> Result<Vec<LogLine>, ApiError> {
        let namespace = self.namespace_for_app(app_name);
        let pods = self.get_pods(app_name).await?;

        let mut logs = Vec::new();
        for pod in pods.items {
            let Some(pod_name) = pod.metadata.name else {
                continue;
            };
            let api: Api<Pod> = Api::namespaced(self.client.clone(), &namespace);
            let params = LogParams {
                tail_lines: Some(tail_lines),
                timestamps: true,
                ..Default::default()
            };

            let Ok(stream) = api.log_stream(&pod_name, &params).await else {
                continue;
            };
            let mut lines = stream.lines();
            while let Ok(Some(message)) = lines.try_next().await {
                logs.push(LogLine {
                    pod: pod_name.clone(),
                    message,
                });
            }
        }

        Ok(logs)
    }
}

async fn stream_pod_logs(
    api: Api<Pod>,
    pod_name: &str,
    opts: LogStreamOptions,
    tx: mpsc::Sender<LogLine>,
) -> Result<(), ApiError> {
    let params = LogParams {
        follow: opts.follow,
        timestamps: opts.timestamps,
        tail_lines: (opts.tail_lines > 0).then_some(opts.tail_lines),
        ..Default::default()
    };

    let stream = api.log_stream(pod_name, &params).await?;
    let mut lines = stream.lines();

    while let Ok(Some(message)) = lines.try_next().await {
        let line = LogLine {
            pod: pod_name.to_string(),
            message,
        };
        // Consumer gone: stop producing.
        if tx.send(line).await.is_err() {
            break;
        }
    }

    Ok(())
}
