//! Domain types and parser for service-graph topology documents.
//!
//! A topology document describes a set of services and, for each, a script
//! of commands (`sleep`, `call`, or a concurrent group of either) that the
//! request engine replays whenever that service receives an inbound request.
//! This crate owns the document's shape end to end: [`parse`] turns YAML
//! text into a validated [`ServiceGraph`], and [`ServiceGraph::to_yaml`]
//! renders one back out.

pub mod byte_size;
pub mod command;
pub mod error;
pub mod graph;
pub mod http_method;
pub mod percentage;
mod raw;
pub mod service;
pub mod service_type;

pub use byte_size::ByteSize;
pub use command::{Command, RequestCommand};
pub use error::{GraphError, Result};
pub use graph::ServiceGraph;
pub use http_method::HttpMethod;
pub use percentage::Percentage;
pub use raw::Defaults;
pub use service::Service;
pub use service_type::ServiceType;

/// Parses and validates a topology document.
///
/// This is the crate's single entry point: it runs the two-phase
/// parse-then-materialize pass described in [`raw`], builds the
/// [`ServiceGraph`], and validates it (unique names, resolvable service
/// references, no nested concurrency) before returning it.
pub fn parse(text: &str) -> Result<ServiceGraph> {
    let (_defaults, services) = raw::parse_document(text)?;
    let graph = ServiceGraph::new(services)?;
    tracing::info!(services = graph.len(), "parsed topology document");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
apiVersion: v1
defaults:
  type: http
  errorRate: 0%
services:
  - name: frontend
    isEntrypoint: true
    script:
      - call: backend
  - name: backend
    responseSize: 10KiB
"#;

    #[test]
    fn parses_minimal_document() {
        let graph = parse(DOC).unwrap();
        assert_eq!(graph.len(), 2);
        let frontend = graph.get("frontend").unwrap();
        assert!(frontend.is_entrypoint);
        assert_eq!(frontend.script.len(), 1);
        let backend = graph.get("backend").unwrap();
        assert_eq!(backend.response_size, ByteSize::from_bytes(10 * 1024));
    }

    #[test]
    fn rejects_reference_to_missing_service() {
        let doc = r#"
services:
  - name: frontend
    script:
      - call: nonexistent
"#;
        assert!(matches!(parse(doc), Err(GraphError::UndefinedService { .. })));
    }

    #[test]
    fn serialize_then_parse_preserves_services() {
        let graph = parse(DOC).unwrap();
        let text = graph.to_yaml().unwrap();
        let reparsed = parse(&text).unwrap();
        assert_eq!(graph, reparsed);
    }

    #[test]
    fn defaults_propagate_to_services_that_omit_the_field() {
        let doc = r#"
defaults:
  responseSize: 4KiB
services:
  - name: a
  - name: b
    responseSize: 1KiB
"#;
        let graph = parse(doc).unwrap();
        assert_eq!(graph.get("a").unwrap().response_size, ByteSize::from_bytes(4 * 1024));
        assert_eq!(graph.get("b").unwrap().response_size, ByteSize::from_bytes(1024));
    }

    #[test]
    fn concurrent_script_form_parses() {
        let doc = r#"
services:
  - name: a
    script:
      - - call: b
        - sleep: 10ms
  - name: b
"#;
        let graph = parse(doc).unwrap();
        let a = graph.get("a").unwrap();
        assert_eq!(a.script.len(), 1);
        assert!(matches!(a.script[0], Command::Concurrent(ref children) if children.len() == 2));
    }
}
