//! Desired-state object builders for the five per-app cluster resources.

use std::collections::{BTreeMap, HashMap};

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvFromSource, HTTPGetAction, Namespace, PodSpec, PodTemplateSpec,
    Probe, Secret, SecretEnvSource, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

pub const MANAGED_BY: &str = "nexo-cloud";
pub const NAME_LABEL: &str = "app.kubernetes.io/name";
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

const INGRESS_CLASS: &str = "traefik";
const CLUSTER_ISSUER: &str = "letsencrypt-prod";
const HEALTH_PATH: &str = "/api/health";

/// Desired state of one app, as handed to the cluster driver.
#[derive(Clone, Debug)]
pub struct AppSpec {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub replicas: i32,
    pub port: i32,
    pub env_vars: HashMap<String, String>,
    pub domain: Option<String>,
    pub domain_suffix: String,
}

impl AppSpec {
    /// The external hostname the ingress terminates.
    pub fn host(&self) -> String {
        match &self.domain {
            Some(domain) if !domain.is_empty() => domain.clone(),
            _ => format!("{}.{}", self.name, self.domain_suffix),
        }
    }

    /// The public URL of the app.
    pub fn url(&self) -> String {
        format!("https://{}", self.host())
    }

    pub fn secret_name(&self) -> String {
        format!("{}-env", self.name)
    }

    pub fn tls_secret_name(&self) -> String {
        format!("{}-tls", self.name)
    }
}

pub fn app_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (NAME_LABEL.to_string(), name.to_string()),
        (MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string()),
    ])
}

pub fn pod_selector(name: &str) -> String {
    format!("{NAME_LABEL}={name}")
}

pub fn generate_namespace(spec: &AppSpec) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(spec.namespace.clone()),
            labels: Some(app_labels(&spec.name)),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn generate_secret(spec: &AppSpec) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(spec.secret_name()),
            namespace: Some(spec.namespace.clone()),
            labels: Some(app_labels(&spec.name)),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        string_data: Some(spec.env_vars.clone().into_iter().collect()),
        ..Default::default()
    }
}

pub fn generate_deployment(spec: &AppSpec) -> Deployment {
    let labels = app_labels(&spec.name);

    let probe = |initial_delay: i32, period: i32| Probe {
        http_get: Some(HTTPGetAction {
            path: Some(HEALTH_PATH.to_string()),
            port: IntOrString::Int(spec.port),
            ..Default::default()
        }),
        initial_delay_seconds: Some(initial_delay),
        period_seconds: Some(period),
        ..Default::default()
    };

    let container = Container {
        name: spec.name.clone(),
        image: Some(spec.image.clone()),
        ports: Some(vec![ContainerPort {
            container_port: spec.port,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        env_from: Some(vec![EnvFromSource {
            secret_ref: Some(SecretEnvSource {
                name: spec.secret_name().into(),
                ..Default::default()
            }),
            ..Default::default()
        }]),
        liveness_probe: Some(probe(10, 30)),
        readiness_probe: Some(probe(5, 10)),
        ..Default::default()
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(spec.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replicas),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn generate_service(spec: &AppSpec) -> Service {
    let labels = app_labels(&spec.name);

    Service {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(spec.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(labels),
            ports: Some(vec![ServicePort {
                name: Some("http".to_string()),
                port: 80,
                target_port: Some(IntOrString::Int(spec.port)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            type_: Some("ClusterIP".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn generate_ingress(spec: &AppSpec) -> Ingress {
    let host = spec.host();

    Ingress {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(spec.namespace.clone()),
            labels: Some(app_labels(&spec.name)),
            annotations: Some(BTreeMap::from([
                (
                    "cert-manager.io/cluster-issuer".to_string(),
                    CLUSTER_ISSUER.to_string(),
                ),
                (
                    "traefik.ingress.kubernetes.io/router.tls".to_string(),
                    "true".to_string(),
                ),
            ])),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: Some(INGRESS_CLASS.to_string()),
            tls: Some(vec![IngressTLS {
                hosts: Some(vec![host.clone()]),
                secret_name: Some(spec.tls_secret_name()),
            }]),
            rules: Some(vec![IngressRule {
                host: Some(host),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: spec.name.clone(),
                                port: Some(ServiceBackendPort {
                                    number: Some(80),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> AppSpec {
        AppSpec {
            name: "myapp".to_string(),
            namespace: "tenant-myapp".to_string(),
            image: "ghcr.io/u/a:v1".to_string(),
            replicas: 2,
            port: 8080,
            env_vars: HashMap::from([("KEY".to_string(), "value".to_string())]),
            domain: None,
            domain_suffix: "nexo.build".to_string(),
        }
    }

    #[test]
    fn url_uses_platform_subdomain_by_default() {
        assert_eq!(spec().url(), "https://myapp.nexo.build");
    }

    #[test]
    fn url_prefers_custom_domain() {
        let mut s = spec();
        s.domain = Some("app.example.com".to_string());
        assert_eq!(s.url(), "https://app.example.com");
    }

    #[test]
    fn namespace_carries_managed_by_labels() {
        let ns = generate_namespace(&spec());
        let labels = ns.metadata.labels.unwrap();
        assert_eq!(labels.get(NAME_LABEL).unwrap(), "myapp");
        assert_eq!(labels.get(MANAGED_BY_LABEL).unwrap(), MANAGED_BY);
    }

    #[test]
    fn secret_is_opaque_with_env_vars() {
        let secret = generate_secret(&spec());
        assert_eq!(secret.metadata.name.as_deref(), Some("myapp-env"));
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        let data = secret.string_data.unwrap();
        assert_eq!(data.get("KEY").unwrap(), "value");
    }

    #[test]
    fn deployment_wires_probes_and_secret() {
        let deployment = generate_deployment(&spec());
        let dspec = deployment.spec.unwrap();
        assert_eq!(dspec.replicas, Some(2));

        let pod = dspec.template.spec.unwrap();
        let container = &pod.containers[0];
        assert_eq!(container.image.as_deref(), Some("ghcr.io/u/a:v1"));
        assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 8080);

        let env_from = container.env_from.as_ref().unwrap();
        assert_eq!(
            env_from[0].secret_ref.as_ref().unwrap().name,
            "myapp-env".to_string()
        );

        let liveness = container.liveness_probe.as_ref().unwrap();
        assert_eq!(liveness.initial_delay_seconds, Some(10));
        assert_eq!(liveness.period_seconds, Some(30));
        let readiness = container.readiness_probe.as_ref().unwrap();
        assert_eq!(readiness.initial_delay_seconds, Some(5));
        assert_eq!(readiness.period_seconds, Some(10));
        assert_eq!(
            liveness.http_get.as_ref().unwrap().path.as_deref(),
            Some(HEALTH_PATH)
        );
    }

    #[test]
    fn service_is_cluster_ip_port_80() {
        let service = generate_service(&spec());
        let sspec = service.spec.unwrap();
        assert_eq!(sspec.type_.as_deref(), Some("ClusterIP"));
        let port = &sspec.ports.as_ref().unwrap()[0];
        assert_eq!(port.port, 80);
        assert_eq!(port.target_port, Some(IntOrString::Int(8080)));
    }

    #[test]
    fn ingress_terminates_tls_for_host() {
        let ingress = generate_ingress(&spec());
        let meta = &ingress.metadata;
        let annotations = meta.annotations.as_ref().unwrap();
        assert_eq!(
            annotations.get("cert-manager.io/cluster-issuer").unwrap(),
            CLUSTER_ISSUER
        );

        let ispec = ingress.spec.unwrap();
        assert_eq!(ispec.ingress_class_name.as_deref(), Some(INGRESS_CLASS));
        let tls = &ispec.tls.as_ref().unwrap()[0];
        assert_eq!(tls.hosts.as_ref().unwrap()[0], "myapp.nexo.build");
        assert_eq!(tls.secret_name.as_deref(), Some("myapp-tls"));
    }

    #[test]
    fn ingress_uses_custom_domain_when_present() {
        let mut s = spec();
        s.domain = Some("app.example.com".to_string());
        let ingress = generate_ingress(&s);
        let rule = &ingress.spec.unwrap().rules.unwrap()[0];
        assert_eq!(rule.host.as_deref(), Some("app.example.com"));
    }
}
