use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::command::Command;
use crate::error::GraphError;
use crate::service::{Service, ServiceDoc};

/// A parsed, validated topology: every [`Service`] it contains names only
/// other services that are also in the graph, and no [`Command::Concurrent`]
/// is nested inside another.
///
/// Construction always validates — there is no way to obtain a
/// `ServiceGraph` that hasn't passed [`validate_graph`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceGraph {
    services: Vec<Service>,
    index: HashMap<String, usize>,
}

impl ServiceGraph {
    /// Builds a graph from an already-materialized service list, checking
    /// name uniqueness and then running full structural validation.
    pub fn new(services: Vec<Service>) -> Result<Self, GraphError> {
        let mut index = HashMap::with_capacity(services.len());
        for (i, service) in services.iter().enumerate() {
            if index.insert(service.name.clone(), i).is_some() {
                return Err(GraphError::DuplicateService { name: service.name.clone() });
            }
        }
        let graph = ServiceGraph { services, index };
        validate_graph(&graph)?;
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Service> {
        self.index.get(name).map(|&i| &self.services[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.services.iter()
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// The first service marked `isEntrypoint: true`, if any. A graph may
    /// have zero, one, or several entrypoints — cardinality requirements
    /// (e.g. "exactly one" for load-generator job generation) are a concern
    /// of the caller that needs it, not of the graph itself.
    pub fn entrypoint(&self) -> Option<&Service> {
        self.services.iter().find(|s| s.is_entrypoint)
    }

    /// Every service marked `isEntrypoint: true`, in graph order.
    pub fn entrypoints(&self) -> impl Iterator<Item = &Service> {
        self.services.iter().filter(|s| s.is_entrypoint)
    }

    /// Renders the graph back to a YAML document. The `defaults` block is
    /// always empty: every [`Service`] field here is already the concrete,
    /// post-default value, so there is nothing left to factor out into a
    /// shared default without re-deriving what the original defaults were
    /// (which the graph does not retain after parsing).
    pub fn to_yaml(&self) -> Result<String, GraphError> {
        #[derive(Serialize)]
        struct EmptyDefaults {}

        #[derive(Serialize)]
        struct Document<'a> {
            #[serde(rename = "apiVersion")]
            api_version: &'a str,
            defaults: EmptyDefaults,
            services: Vec<ServiceDoc<'a>>,
        }

        let doc = Document {
            api_version: "v1",
            defaults: EmptyDefaults {},
            services: self.services.iter().map(ServiceDoc::from).collect(),
        };
        Ok(serde_yaml::to_string(&doc)?)
    }
}

/// Walks every service's script checking that `Request` commands target a
/// known service and that `Concurrent` commands are never nested.
pub(crate) fn validate_graph(graph: &ServiceGraph) -> Result<(), GraphError> {
    let names: HashSet<&str> = graph.services.iter().map(|s| s.name.as_str()).collect();
    for service in &graph.services {
        validate_commands(&service.script, &names, 0)?;
    }
    Ok(())
}

fn validate_commands(cmds: &[Command], names: &HashSet<&str>, depth: u8) -> Result<(), GraphError> {
    for cmd in cmds {
        match cmd {
            Command::Sleep(_) => {}
            Command::Request(req) => {
                if !names.contains(req.service_name.as_str()) {
                    return Err(GraphError::UndefinedService { name: req.service_name.clone() });
                }
            }
            Command::Concurrent(children) => {
                if depth >= 1 {
                    return Err(GraphError::NestedConcurrent);
                }
                validate_commands(children, names, depth + 1)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_size::ByteSize;
    use crate::command::RequestCommand;
    use crate::percentage::Percentage;
    use crate::service_type::ServiceType;

    fn plain_service(name: &str, script: Vec<Command>) -> Service {
        Service {
            name: name.to_string(),
            service_type: ServiceType::Http,
            is_entrypoint: false,
            error_rate: Percentage::ZERO,
            response_size: ByteSize::ZERO,
            script,
        }
    }

    #[test]
    fn rejects_duplicate_names() {
        let services = vec![plain_service("a", vec![]), plain_service("a", vec![])];
        assert!(matches!(
            ServiceGraph::new(services),
            Err(GraphError::DuplicateService { .. })
        ));
    }

    #[test]
    fn rejects_undefined_service_reference() {
        let services = vec![plain_service(
            "a",
            vec![Command::Request(RequestCommand {
                service_name: "ghost".into(),
                size: ByteSize::ZERO,
            })],
        )];
        assert!(matches!(
            ServiceGraph::new(services),
            Err(GraphError::UndefinedService { .. })
        ));
    }

    #[test]
    fn rejects_nested_concurrent_at_any_depth() {
        let nested = Command::Concurrent(vec![Command::Concurrent(vec![])]);
        let services = vec![plain_service("a", vec![nested])];
        assert!(matches!(
            ServiceGraph::new(services),
            Err(GraphError::NestedConcurrent)
        ));
    }

    #[test]
    fn accepts_valid_graph() {
        let services = vec![
            plain_service(
                "a",
                vec![Command::Request(RequestCommand {
                    service_name: "b".into(),
                    size: ByteSize::ZERO,
                })],
            ),
            plain_service("b", vec![]),
        ];
        let graph = ServiceGraph::new(services).unwrap();
        assert_eq!(graph.len(), 2);
        assert!(graph.get("a").is_some());
    }

    #[test]
    fn entrypoints_reports_zero_one_or_many() {
        let services = vec![plain_service("a", vec![]), plain_service("b", vec![])];
        let graph = ServiceGraph::new(services).unwrap();
        assert_eq!(graph.entrypoints().count(), 0);
        assert!(graph.entrypoint().is_none());

        let mut services = vec![plain_service("a", vec![]), plain_service("b", vec![])];
        services[0].is_entrypoint = true;
        services[1].is_entrypoint = true;
        let graph = ServiceGraph::new(services).unwrap();
        assert_eq!(graph.entrypoints().count(), 2);
    }
}
