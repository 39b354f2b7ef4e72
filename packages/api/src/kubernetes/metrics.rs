//! Resource metrics derived from pod resource requests.
//!
//! Sums `resources.requests` over the app's pods. A missing metrics API
//! is not fatal — callers receive zeros and compute uptime from
//! `ready_pods / pod_count`.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::client::ClusterClient;
use crate::error::ApiError;

/// Per-pod resource numbers.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PodMetrics {
    pub name: String,
    pub cpu_cores: f64,
    pub memory_bytes: i64,
    pub memory_mb: f64,
}

/// Aggregated resource numbers for an app.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AppMetrics {
    pub app_name: String,
    pub namespace: String,
    pub pod_count: usize,
    pub ready_pods: usize,
    pub total_cpu_cores: f64,
    pub total_memory_mb: f64,
    pub avg_cpu_cores: f64,
    pub avg_memory_mb: f64,
    pub pods: Vec<PodMetrics>,
}

impl ClusterClient {
    pub async fn get_app_metrics(&self, app_name: &str) -> Result<AppMetrics, ApiError> {
        let pods = self.get_pods(app_name).await?;

        let mut metrics = AppMetrics {
            app_name: app_name.to_string(),
            namespace: self.namespace_for_app(app_name),
            pod_count: pods.items.len(),
            ready_pods: 0,
            total_cpu_cores: 0.0,
            total_memory_mb: 0.0,
            avg_cpu_cores: 0.0,
            avg_memory_mb: 0.0,
            pods: Vec::with_capacity(pods.items.len()),
        };

        let mut total_memory_bytes: i64 = 0;

        for pod in &pods.items {
            let mut pod_metric = PodMetrics {
                name: pod.metadata.name.clone().unwrap_or_default(),
                cpu_cores: 0.0,
                memory_bytes: 0,
                memory_mb: 0.0,
            };

            let ready = pod
                .status
                .as_ref()
                .and_then(|s| s.conditions.as_ref())
                .map(|conditions| {
                    conditions
                        .iter()
                        .any(|c| c.type_ == "Ready" && c.status == "True")
                })
                .unwrap_or(false);
            if ready {
                metrics.ready_pods += 1;
            }

            if let Some(spec) = pod.spec.as_ref() {
                for container in &spec.containers {
                    let Some(requests) = container
                        .resources
                        .as_ref()
                        .and_then(|r| r.requests.as_ref())
                    else {
                        continue;
                    };
                    if let Some(cpu) = requests.get("cpu") {
                        pod_metric.cpu_cores += parse_cpu_quantity(cpu);
                    }
                    if let Some(memory) = requests.get("memory") {
                        pod_metric.memory_bytes += parse_memory_quantity(memory);
                    }
                }
            }

            pod_metric.memory_mb = pod_metric.memory_bytes as f64 / (1024.0 * 1024.0);
            metrics.total_cpu_cores += pod_metric.cpu_cores;
            total_memory_bytes += pod_metric.memory_bytes;
            metrics.pods.push(pod_metric);
        }

        metrics.total_memory_mb = total_memory_bytes as f64 / (1024.0 * 1024.0);
        if metrics.pod_count > 0 {
            metrics.avg_cpu_cores = metrics.total_cpu_cores / metrics.pod_count as f64;
            metrics.avg_memory_mb = metrics.total_memory_mb / metrics.pod_count as f64;
        }

        Ok(metrics)
    }
}

/// Parse a CPU quantity into fractional cores ("500m" -> 0.5, "2" -> 2.0).
fn parse_cpu_quantity(quantity: &Quantity) -> f64 {
    let value = quantity.0.trim();
    if let Some(milli) = value.strip_suffix('m') {
        return milli.parse::<f64>().map(|v| v / 1000.0).unwrap_or(0.0);
    }
    value.parse::<f64>().unwrap_or(0.0)
}

/// Parse a memory quantity into bytes ("256Mi" -> 268435456).
fn parse_memory_quantity(quantity: &Quantity) -> i64 {
    let value = quantity.0.trim();

    const SUFFIXES: [(&str, i64); 8] = [
        ("Ki", 1 << 10),
        ("Mi", 1 << 20),
        ("Gi", 1 << 30),
        ("Ti", 1 << 40),
        ("K", 1_000),
        ("M", 1_000_000),
        ("G", 1_000_000_000),
        ("T", 1_000_000_000_000),
    ];

    for (suffix, factor) in SUFFIXES {
        if let Some(number) = value.strip_suffix(suffix) {
            return number
                .parse::<f64>()
                .map(|v| (v * factor as f64) as i64)
                .unwrap_or(0);
        }
    }

    value.parse::<f64>().map(|v| v as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        Quantity(s.to_string())
    }

    #[test]
    fn cpu_millis_to_cores() {
        assert_eq!(parse_cpu_quantity(&q("500m")), 0.5);
        assert_eq!(parse_cpu_quantity(&q("100m")), 0.1);
        assert_eq!(parse_cpu_quantity(&q("2")), 2.0);
        assert_eq!(parse_cpu_quantity(&q("0.25")), 0.25);
        assert_eq!(parse_cpu_quantity(&q("bogus")), 0.0);
    }

    #[test]
    fn memory_suffixes_to_bytes() {
        assert_eq!(parse_memory_quantity(&q("1Ki")), 1024);
        assert_eq!(parse_memory_quantity(&q("256Mi")), 256 * 1024 * 1024);
        assert_eq!(parse_memory_quantity(&q("1Gi")), 1024 * 1024 * 1024);
        assert_eq!(parse_memory_quantity(&q("1M")), 1_000_000);
        assert_eq!(parse_memory_quantity(&q("12345")), 12345);
        assert_eq!(parse_memory_quantity(&q("bogus")), 0);
    }
}
