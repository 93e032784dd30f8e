use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::handler::{handle_request, Handler};

async fn metrics_endpoint(
    axum::extract::State(handler): axum::extract::State<Arc<Handler>>,
) -> (StatusCode, String) {
    match handler.metrics.gather() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Builds the two-route router this service exposes: `/` (the script
/// replay handler) and `/metrics` (the Prometheus registry).
pub fn build_router(handler: Arc<Handler>) -> Router {
    Router::new()
        .route("/", get(handle_request))
        .route("/metrics", get(metrics_endpoint))
        .with_state(handler)
}
