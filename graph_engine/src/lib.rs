//! The request engine: replays one service's script against the rest of the
//! graph over HTTP, exposing `/` (the handler) and `/metrics` (Prometheus).

pub mod dump;
pub mod error;
pub mod handler;
pub mod headers;
pub mod metrics;
pub mod router;

pub use error::{EngineError, Result};
pub use handler::{Handler, SERVICE_PORT};
pub use metrics::Metrics;
pub use router::build_router;
