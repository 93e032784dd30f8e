use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, Version};
use axum::response::Response;
use graph_model::{Command, RequestCommand, Service, ServiceType};

use crate::dump::dump_request;
use crate::error::{EngineError, Result};
use crate::headers;
use crate::metrics::Metrics;

/// The port every emulated service listens on and is dialed at. Mirrors the
/// fixed convention the manifest generator bakes into every Deployment.
pub const SERVICE_PORT: u16 = 8080;

/// Everything one running service instance needs to replay its own script:
/// its own (already-materialized) definition, a name→type lookup for every
/// other service in the graph, the shared metrics registry, and the shared
/// HTTP client.
pub struct Handler {
    pub service: Service,
    pub service_types: HashMap<String, ServiceType>,
    pub metrics: Arc<Metrics>,
    pub client: reqwest::Client,
    pub hostname: String,
    /// Dark feature: the errorRate-driven error-chance roll described in the
    /// original source. Disabled by default; nothing in this codebase turns
    /// it on.
    pub error_injection_enabled: bool,
}

impl Handler {
    pub fn new(
        service: Service,
        service_types: HashMap<String, ServiceType>,
        metrics: Arc<Metrics>,
        client: reqwest::Client,
    ) -> Self {
        let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        Handler {
            service,
            service_types,
            metrics,
            client,
            hostname,
            error_injection_enabled: false,
        }
    }

    fn rolls_injected_error(&self) -> bool {
        if !self.error_injection_enabled {
            return false;
        }
        let roll: f64 = rand::random();
        roll < self.service.error_rate.as_fraction()
    }
}

/// Executes one `Request` command: dials the target over the shared client,
/// forwarding `headers`, and reports both the path traces it read off the
/// response and whether the call itself succeeded.
async fn execute_request(
    handler: &Handler,
    req: &RequestCommand,
    headers: &HeaderMap,
) -> (Vec<String>, Result<()>) {
    let target = req.service_name.as_str();
    if !handler.service_types.contains_key(target) {
        return (vec![], Err(EngineError::UndefinedService { name: target.to_string() }));
    }

    let url = format!("http://{target}:{SERVICE_PORT}/");
    let body = vec![0u8; req.size.bytes() as usize];
    let body_len = body.len() as f64;

    let mut builder = handler.client.get(&url);
    for (name, value) in headers.iter() {
        if let Ok(v) = value.to_str() {
            builder = builder.header(name.as_str(), v);
        }
    }
    builder = builder.body(body);

    handler.metrics.outgoing_requests_total.with_label_values(&[target]).inc();
    handler.metrics.outgoing_request_size.with_label_values(&[target]).observe(body_len);

    match builder.send().await {
        Ok(response) => {
            let status = response.status();
            let paths: Vec<String> = response
                .headers()
                .get_all(headers::PATH_TRACES_HEADER)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::to_string)
                .collect();
            // Drain and close the body so the connection returns to the pool.
            let _ = response.bytes().await;

            if status.as_u16() == 500 {
                (paths, Err(EngineError::Downstream { service: target.to_string(), status: 500 }))
            } else {
                if !status.is_success() {
                    tracing::warn!(
                        destination = target,
                        status = status.as_u16(),
                        "downstream returned a non-2xx, non-500 status"
                    );
                }
                (paths, Ok(()))
            }
        }
        Err(e) => (vec![], Err(EngineError::Network(e))),
    }
}

/// Executes a single script step, recursing into `Concurrent` children via
/// `tokio::spawn` joined unconditionally (never cancelled on first failure).
fn execute_command(
    handler: Arc<Handler>,
    cmd: Command,
    headers: HeaderMap,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = (Vec<String>, Result<()>)> + Send>> {
    Box::pin(async move {
        match cmd {
            Command::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                (vec![], Ok(()))
            }
            Command::Request(req) => execute_request(&handler, &req, &headers).await,
            Command::Concurrent(children) => {
                let tasks: Vec<_> = children
                    .into_iter()
                    .map(|child| {
                        let handler = handler.clone();
                        let headers = headers.clone();
                        tokio::spawn(execute_command(handler, child, headers))
                    })
                    .collect();

                let joined = futures::future::join_all(tasks).await;
                let mut all_paths = Vec::new();
                let mut outcomes = Vec::new();
                for result in joined {
                    match result {
                        Ok((paths, outcome)) => {
                            all_paths.extend(paths);
                            outcomes.push(outcome);
                        }
                        Err(join_error) => {
                            tracing::error!(error = %join_error, "concurrent branch task panicked");
                            outcomes.push(Err(EngineError::TaskPanicked(join_error.to_string())));
                        }
                    }
                }
                (all_paths, EngineError::aggregate(outcomes))
            }
        }
    })
}

/// Runs the service's whole script sequentially, stopping at the first
/// failing top-level step. Path traces accumulate across every step that
/// ran, including the one that failed.
async fn execute_script(handler: Arc<Handler>, headers: HeaderMap) -> (Vec<String>, Result<()>) {
    let script = handler.service.script.clone();
    let mut all_paths = Vec::new();
    for cmd in script {
        let (paths, outcome) = execute_command(handler.clone(), cmd, headers.clone()).await;
        all_paths.extend(paths);
        if let Err(e) = outcome {
            return (all_paths, Err(e));
        }
    }
    (all_paths, Ok(()))
}

/// The `GET /` handler: replays the service's script, stamps the path
/// trace, and echoes the inbound request as the response body.
pub async fn handle_request(
    State(handler): State<Arc<Handler>>,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
) -> Response<Body> {
    use tracing::Instrument;

    let span = tracing::info_span!(
        "request",
        service = %handler.service.name,
        request_id = ?headers.get("x-request-id"),
    );

    async move {
        handler.metrics.incoming_requests_total.inc();
        let start = Instant::now();

        let forward = headers::forwardable_subset(&headers);

        // `local_error` marks only the error-injection roll below, never a
        // downstream failure — the ERROR stamp is reserved for errors this
        // service itself raised, not ones it merely relayed.
        let mut local_error = false;
        let (inbound_paths, outcome) = if handler.rolls_injected_error() {
            local_error = true;
            (Vec::new(), Err(EngineError::Downstream {
                service: handler.service.name.clone(),
                status: 500,
            }))
        } else {
            execute_script(handler.clone(), forward).await
        };

        if let Err(ref e) = outcome {
            tracing::error!(error = %e, service = %handler.service.name, "script execution failed");
        }
        let status = if outcome.is_err() { StatusCode::INTERNAL_SERVER_ERROR } else { StatusCode::OK };

        let stamp = headers::stamp(&handler.service.name, &handler.hostname, local_error);
        let path_traces = headers::stamp_paths(&stamp, &inbound_paths);

        let body = dump_request(&method, &uri, version, &headers);
        let body_len = body.len() as f64;

        let code = status.as_u16().to_string();
        handler
            .metrics
            .request_duration_seconds
            .with_label_values(&[&code])
            .observe(start.elapsed().as_secs_f64());
        handler.metrics.response_size.with_label_values(&[&code]).observe(body_len);

        let mut builder = Response::builder().status(status);
        if let Some(response_headers) = builder.headers_mut() {
            headers::set_path_traces(response_headers, &path_traces);
        }
        builder.body(Body::from(body)).expect("response with a string body is always valid")
    }
    .instrument(span)
    .await
}
