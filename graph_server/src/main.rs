//! Boots one emulated service: reads `SERVICE_NAME` and the mounted topology
//! document, resolves this process's own place in the graph, and serves the
//! request engine's router on the canonical service port.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use graph_engine::{build_router, Handler, Metrics, SERVICE_PORT};

/// `service-graph-server` — one emulated node in a topology.
#[derive(Parser, Debug)]
#[command(name = "service-graph-server")]
struct Args {
    /// Path to the topology document this service's script is read from.
    #[arg(long, default_value = "/etc/config/service-graph.yaml")]
    topology_path: std::path::PathBuf,

    /// Idle-connection pool size per downstream host, shared by the client
    /// used for every outgoing request.
    #[arg(long, default_value_t = 2)]
    max_idle_connections_per_host: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = ?e, "bootstrap failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let service_name =
        std::env::var("SERVICE_NAME").context("SERVICE_NAME environment variable is required")?;

    let topology_text = std::fs::read_to_string(&args.topology_path)
        .with_context(|| format!("reading topology document at {}", args.topology_path.display()))?;
    let graph = graph_model::parse(&topology_text).context("parsing topology document")?;

    let service = graph
        .get(&service_name)
        .with_context(|| format!("SERVICE_NAME \"{service_name}\" is not in the topology"))?
        .clone();

    let service_types: HashMap<String, graph_model::ServiceType> =
        graph.iter().map(|s| (s.name.clone(), s.service_type)).collect();

    let client = reqwest::ClientBuilder::new()
        .pool_max_idle_per_host(args.max_idle_connections_per_host)
        .build()
        .context("building the shared HTTP client")?;

    let metrics = Arc::new(Metrics::new().context("registering Prometheus metric families")?);
    let handler = Arc::new(Handler::new(service, service_types, metrics, client));

    let router = build_router(handler)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{SERVICE_PORT}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(service = %service_name, %addr, "serving");
    axum::serve(listener, router).await.context("server exited")?;
    Ok(())
}
