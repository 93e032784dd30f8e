use std::collections::BTreeMap;

use graph_model::ServiceGraph;

use crate::consts::{
    CLIENT_CONTAINER_NAME, CLIENT_METRICS_PORT, CLIENT_NAME, CONFIG_PATH, CONFIG_VOLUME_NAME,
    SERVICE_CONTAINER_NAME, SERVICE_GRAPH_CONFIG_MAP_KEY, SERVICE_GRAPH_CONFIG_MAP_NAME,
    SERVICE_GRAPH_NAMESPACE, SERVICE_GRAPH_YAML_FILE_NAME, SERVICE_NAME_ENV_KEY, SERVICE_PORT,
};
use crate::error::{ManifestError, Result};
use crate::k8s::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, Deployment, DeploymentSpec, EnvVar,
    Job, JobSpec, K8sService, KeyToPath, LabelSelector, Namespace, ObjectMeta, PodObjectMeta,
    PodSpec, PodTemplateSpec, ServicePort, ServiceSpec, Volume, VolumeMount, VolumeSource,
};

/// Parameters for generating the long-lived Deployment/Service manifests.
#[derive(Debug, Clone)]
pub struct ManifestOptions {
    pub service_node_selector: BTreeMap<String, String>,
    pub service_image: String,
    pub max_idle_connections_per_host: u32,
    pub client_node_selector: BTreeMap<String, String>,
    pub client_image: String,
    pub client_args: Vec<String>,
}

/// Parameters for generating the run-once load-generator Job.
#[derive(Debug, Clone)]
pub struct LoadGeneratorJobOptions {
    pub client_node_selector: BTreeMap<String, String>,
    pub client_image: String,
    pub client_args: Vec<String>,
}

fn config_volume() -> Volume {
    Volume {
        name: CONFIG_VOLUME_NAME.to_string(),
        source: VolumeSource {
            config_map: ConfigMapVolumeSource {
                name: SERVICE_GRAPH_CONFIG_MAP_NAME.to_string(),
                items: vec![KeyToPath {
                    key: SERVICE_GRAPH_CONFIG_MAP_KEY.to_string(),
                    path: SERVICE_GRAPH_YAML_FILE_NAME.to_string(),
                }],
            },
        },
    }
}

fn make_namespace() -> Namespace {
    Namespace::new(
        ObjectMeta::new(SERVICE_GRAPH_NAMESPACE).labeled("istio-injection", "enabled"),
    )
}

fn make_config_map(topology_yaml: &str) -> ConfigMap {
    let metadata = ObjectMeta::new(SERVICE_GRAPH_CONFIG_MAP_NAME)
        .namespaced(SERVICE_GRAPH_NAMESPACE)
        .labeled("app", "service-graph");
    let mut data = BTreeMap::new();
    data.insert(SERVICE_GRAPH_CONFIG_MAP_KEY.to_string(), topology_yaml.to_string());
    ConfigMap::new(metadata, data)
}

fn make_service_deployment(
    service: &graph_model::Service,
    opts: &ManifestOptions,
) -> Deployment {
    let metadata = ObjectMeta::new(&service.name)
        .namespaced(SERVICE_GRAPH_NAMESPACE)
        .labeled("app", "service-graph")
        .annotated("prometheus.io/scrape", "true");

    let mut pod_labels = BTreeMap::new();
    pod_labels.insert("name".to_string(), service.name.clone());
    pod_labels.insert("role".to_string(), "service".to_string());

    let container = Container {
        name: SERVICE_CONTAINER_NAME.to_string(),
        image: opts.service_image.clone(),
        args: vec![format!(
            "--max-idle-connections-per-host={}",
            opts.max_idle_connections_per_host
        )],
        env: vec![EnvVar {
            name: SERVICE_NAME_ENV_KEY.to_string(),
            value: service.name.clone(),
        }],
        ports: vec![ContainerPort { container_port: SERVICE_PORT }],
        volume_mounts: vec![VolumeMount {
            name: CONFIG_VOLUME_NAME.to_string(),
            mount_path: CONFIG_PATH.to_string(),
        }],
    };

    let spec = DeploymentSpec {
        replicas: None,
        selector: LabelSelector {
            match_labels: BTreeMap::from([("name".to_string(), service.name.clone())]),
        },
        template: PodTemplateSpec {
            metadata: PodObjectMeta { labels: pod_labels },
            spec: PodSpec {
                node_selector: opts.service_node_selector.clone(),
                containers: vec![container],
                volumes: vec![config_volume()],
                restart_policy: None,
            },
        },
    };
    Deployment::new(metadata, spec)
}

fn make_service_service(service: &graph_model::Service) -> K8sService {
    let metadata = ObjectMeta::new(&service.name)
        .namespaced(SERVICE_GRAPH_NAMESPACE)
        .labeled("app", "service-graph")
        .annotated("prometheus.io/scrape", "true");
    let spec = ServiceSpec {
        ports: vec![ServicePort { port: SERVICE_PORT }],
        selector: BTreeMap::from([("name".to_string(), service.name.clone())]),
    };
    K8sService::new(metadata, spec)
}

fn make_load_generator_deployment(opts: &ManifestOptions) -> Deployment {
    let metadata = ObjectMeta::new(CLIENT_NAME).labeled("app", "client");
    let mut args = vec!["server".to_string()];
    args.extend(opts.client_args.iter().cloned());

    let container = Container {
        name: CLIENT_CONTAINER_NAME.to_string(),
        image: opts.client_image.clone(),
        args,
        ports: vec![
            ContainerPort { container_port: SERVICE_PORT },
            ContainerPort { container_port: CLIENT_METRICS_PORT },
        ],
        ..Default::default()
    };

    let spec = DeploymentSpec {
        replicas: None,
        selector: LabelSelector { match_labels: BTreeMap::from([("app".to_string(), "client".to_string())]) },
        template: PodTemplateSpec {
            metadata: PodObjectMeta {
                labels: BTreeMap::from([("app".to_string(), "client".to_string())]),
            },
            spec: PodSpec {
                node_selector: opts.client_node_selector.clone(),
                containers: vec![container],
                volumes: vec![],
                restart_policy: None,
            },
        },
    };
    Deployment::new(metadata, spec)
}

fn make_load_generator_service() -> K8sService {
    let metadata = ObjectMeta::new(CLIENT_NAME).labeled("app", "client");
    let spec = ServiceSpec {
        ports: vec![ServicePort { port: SERVICE_PORT }],
        selector: BTreeMap::from([("app".to_string(), "client".to_string())]),
    };
    K8sService::new(metadata, spec)
}

fn join_documents(docs: Vec<String>) -> String {
    docs.iter().map(|d| d.trim_end()).collect::<Vec<_>>().join("\n---\n")
}

/// Renders the full manifest stream: namespace, config map, one
/// Deployment+Service pair per service (in graph order), and the long-lived
/// load-generator Deployment+Service.
pub fn generate_manifests(
    graph: &ServiceGraph,
    topology_yaml: &str,
    opts: &ManifestOptions,
) -> Result<String> {
    let mut docs = Vec::with_capacity(3 + graph.len() * 2);
    docs.push(serde_yaml::to_string(&make_namespace())?);
    docs.push(serde_yaml::to_string(&make_config_map(topology_yaml))?);

    for service in graph.iter() {
        docs.push(serde_yaml::to_string(&make_service_deployment(service, opts))?);
        docs.push(serde_yaml::to_string(&make_service_service(service))?);
    }

    docs.push(serde_yaml::to_string(&make_load_generator_deployment(opts))?);
    docs.push(serde_yaml::to_string(&make_load_generator_service())?);

    let rendered = join_documents(docs);
    tracing::info!(services = graph.len(), "generated full manifest stream");
    Ok(rendered)
}

/// The namespace, config map, and per-service Deployment/Service pairs —
/// the half of the stream the CLI writes to the service out-path.
pub fn generate_service_manifests(
    graph: &ServiceGraph,
    topology_yaml: &str,
    opts: &ManifestOptions,
) -> Result<String> {
    let mut docs = Vec::with_capacity(2 + graph.len() * 2);
    docs.push(serde_yaml::to_string(&make_namespace())?);
    docs.push(serde_yaml::to_string(&make_config_map(topology_yaml))?);
    for service in graph.iter() {
        docs.push(serde_yaml::to_string(&make_service_deployment(service, opts))?);
        docs.push(serde_yaml::to_string(&make_service_service(service))?);
    }
    let rendered = join_documents(docs);
    tracing::info!(services = graph.len(), "generated service manifests");
    Ok(rendered)
}

/// The long-lived load-generator Deployment/Service pair — the half of the
/// stream the CLI writes to the client out-path.
pub fn generate_client_manifests(opts: &ManifestOptions) -> Result<String> {
    let docs = vec![
        serde_yaml::to_string(&make_load_generator_deployment(opts))?,
        serde_yaml::to_string(&make_load_generator_service())?,
    ];
    let rendered = join_documents(docs);
    tracing::info!("generated client manifests");
    Ok(rendered)
}

/// Renders the run-once load-generator Job, targeting the graph's single
/// entrypoint service. Fails if there isn't exactly one.
pub fn generate_load_generator_job(
    graph: &ServiceGraph,
    opts: &LoadGeneratorJobOptions,
) -> Result<String> {
    let mut entrypoints = graph.entrypoints();
    let entrypoint = entrypoints.next().ok_or(ManifestError::MissingEntrypoint)?;
    let extra = entrypoints.count();
    if extra > 0 {
        return Err(ManifestError::MultipleEntrypoints { count: extra + 1 });
    }
    let target = format!(
        "http://{}.{}.svc.cluster.local:{}",
        entrypoint.name, SERVICE_GRAPH_NAMESPACE, SERVICE_PORT
    );

    let mut args = opts.client_args.clone();
    args.push(target);

    let container = Container {
        name: CLIENT_CONTAINER_NAME.to_string(),
        image: opts.client_image.clone(),
        args,
        ..Default::default()
    };

    let metadata = ObjectMeta::new(format!("{CLIENT_NAME}-job")).labeled("app", "client");
    let spec = JobSpec {
        template: PodTemplateSpec {
            metadata: PodObjectMeta {
                labels: BTreeMap::from([("app".to_string(), "client".to_string())]),
            },
            spec: PodSpec {
                node_selector: opts.client_node_selector.clone(),
                containers: vec![container],
                volumes: vec![],
                restart_policy: Some("Never"),
            },
        },
    };

    let rendered = serde_yaml::to_string(&Job::new(metadata, spec))?;
    tracing::info!(entrypoint = %entrypoint.name, "generated load-generator job");
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_model::parse;

    fn opts() -> ManifestOptions {
        ManifestOptions {
            service_node_selector: BTreeMap::new(),
            service_image: "example/service-graph-service:latest".to_string(),
            max_idle_connections_per_host: 2,
            client_node_selector: BTreeMap::new(),
            client_image: "example/fortio:latest".to_string(),
            client_args: vec![],
        }
    }

    const DOC: &str = r#"
services:
  - name: frontend
    isEntrypoint: true
    script:
      - call: backend
  - name: backend
"#;

    #[test]
    fn generates_one_document_stream_in_graph_order() {
        let graph = parse(DOC).unwrap();
        let yaml = generate_manifests(&graph, DOC, &opts()).unwrap();
        let docs: Vec<&str> = yaml.split("\n---\n").collect();
        // namespace, configmap, 2x(deployment+service) per service, client deployment+service
        assert_eq!(docs.len(), 2 + 4 + 2);

        let frontend_idx = docs.iter().position(|d| d.contains("name: frontend")).unwrap();
        let backend_idx = docs.iter().position(|d| d.contains("name: backend")).unwrap();
        assert!(frontend_idx < backend_idx);
    }

    #[test]
    fn job_targets_the_sole_entrypoint() {
        let graph = parse(DOC).unwrap();
        let job_opts = LoadGeneratorJobOptions {
            client_node_selector: BTreeMap::new(),
            client_image: "example/fortio:latest".to_string(),
            client_args: vec![],
        };
        let yaml = generate_load_generator_job(&graph, &job_opts).unwrap();
        assert!(yaml.contains("http://frontend.service-graph.svc.cluster.local:8080"));
        assert!(yaml.contains("restartPolicy: Never"));
    }

    #[test]
    fn service_and_client_manifests_partition_the_full_stream() {
        let graph = parse(DOC).unwrap();
        let full = generate_manifests(&graph, DOC, &opts()).unwrap();
        let service = generate_service_manifests(&graph, DOC, &opts()).unwrap();
        let client = generate_client_manifests(&opts()).unwrap();

        assert!(service.contains("name: frontend"));
        assert!(service.contains("name: backend"));
        assert!(!service.contains("load-generator-client"));
        assert!(client.contains("load-generator-client"));

        let recombined = format!("{service}\n---\n{client}");
        let full_docs: std::collections::HashSet<&str> = full.split("\n---\n").collect();
        let recombined_docs: std::collections::HashSet<&str> = recombined.split("\n---\n").collect();
        assert_eq!(full_docs, recombined_docs);
    }

    #[test]
    fn job_generation_fails_without_an_entrypoint() {
        let doc = "services:\n  - name: a\n";
        let graph = parse(doc).unwrap();
        let job_opts = LoadGeneratorJobOptions {
            client_node_selector: BTreeMap::new(),
            client_image: "x".to_string(),
            client_args: vec![],
        };
        assert!(generate_load_generator_job(&graph, &job_opts).is_err());
    }

    #[test]
    fn job_generation_fails_with_more_than_one_entrypoint() {
        let doc = r#"
services:
  - name: frontend
    isEntrypoint: true
  - name: backend
    isEntrypoint: true
"#;
        let graph = parse(doc).unwrap();
        let job_opts = LoadGeneratorJobOptions {
            client_node_selector: BTreeMap::new(),
            client_image: "x".to_string(),
            client_args: vec![],
        };
        let err = generate_load_generator_job(&graph, &job_opts).unwrap_err();
        assert!(matches!(err, ManifestError::MultipleEntrypoints { count: 2 }));
    }
}
