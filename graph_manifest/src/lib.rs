//! Kubernetes manifest generation for a parsed service graph.
//!
//! Turns a [`graph_model::ServiceGraph`] into the YAML document stream a
//! cluster API client would apply: a namespace, a ConfigMap carrying the
//! topology document, one Deployment/Service pair per service, and a
//! load-generator Deployment/Service (or, for performance runs, a one-shot
//! Job). Also renders the Prometheus Helm-values fragment that labels
//! scraped metrics by topology.

pub mod consts;
pub mod error;
mod generate;
pub mod k8s;
pub mod labels;
pub mod node_selector;
pub mod prometheus_values;

pub use error::{ManifestError, Result};
pub use generate::{
    generate_client_manifests, generate_load_generator_job, generate_manifests,
    generate_service_manifests, LoadGeneratorJobOptions, ManifestOptions,
};
pub use labels::labels_for;
pub use node_selector::parse_node_selector;
pub use prometheus_values::labels_to_prometheus_values_yaml;
