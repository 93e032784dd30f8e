//! `service-graph-gen` — renders a topology document into the Kubernetes
//! manifests that run it: a service half (namespace, config map, one
//! Deployment/Service pair per service) and a client half (the long-lived
//! load-generator Deployment/Service).

use anyhow::Context;
use clap::Parser;
use graph_manifest::{generate_client_manifests, generate_service_manifests, ManifestOptions};

/// `service-graph-gen` — convert a service-graph topology document into
/// Kubernetes manifests.
#[derive(Parser, Debug)]
#[command(name = "service-graph-gen")]
struct Args {
    /// Path to the input topology document (YAML or JSON).
    in_path: std::path::PathBuf,

    /// Path the service manifests (namespace, config map, per-service
    /// Deployment/Service pairs) are written to.
    service_out_path: std::path::PathBuf,

    /// Path the client manifests (load-generator Deployment/Service) are
    /// written to.
    client_out_path: std::path::PathBuf,

    /// Node selector applied to every service pod, as `key=value`.
    service_node_selector: String,

    /// Node selector applied to the load-generator pod, as `key=value`.
    client_node_selector: String,

    /// Container image used for every emulated service.
    #[arg(long, default_value = "gcr.io/istio-testing/service-graph:latest")]
    service_image: String,

    /// Container image used for the load-generator client.
    #[arg(long, default_value = "gcr.io/istio-testing/fortio:latest")]
    client_image: String,

    /// Extra arguments passed to the load-generator container, comma-separated.
    #[arg(long, value_delimiter = ',', default_value = "")]
    client_args: Vec<String>,

    /// Idle-connection pool size configured on every emulated service.
    #[arg(long, default_value_t = 2)]
    service_max_idle_connections_per_host: u32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        tracing::error!(error = ?e, "manifest generation failed");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let topology_yaml = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("reading topology document at {}", args.in_path.display()))?;
    let graph = graph_model::parse(&topology_yaml).context("parsing topology document")?;

    let service_node_selector = graph_manifest::parse_node_selector(&args.service_node_selector)
        .context("parsing service node selector")?;
    let client_node_selector = graph_manifest::parse_node_selector(&args.client_node_selector)
        .context("parsing client node selector")?;

    let client_args: Vec<String> =
        args.client_args.into_iter().filter(|a| !a.is_empty()).collect();

    let opts = ManifestOptions {
        service_node_selector,
        service_image: args.service_image,
        max_idle_connections_per_host: args.service_max_idle_connections_per_host,
        client_node_selector,
        client_image: args.client_image,
        client_args,
    };

    let service_manifests = generate_service_manifests(&graph, &topology_yaml, &opts)
        .context("rendering service manifests")?;
    let client_manifests =
        generate_client_manifests(&opts).context("rendering client manifests")?;

    std::fs::write(&args.service_out_path, service_manifests)
        .with_context(|| format!("writing {}", args.service_out_path.display()))?;
    std::fs::write(&args.client_out_path, client_manifests)
        .with_context(|| format!("writing {}", args.client_out_path.display()))?;

    Ok(())
}
