use thiserror::Error;

/// Errors produced while rendering Kubernetes manifests for a service graph.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read topology file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to render manifest YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Graph(#[from] graph_model::GraphError),

    #[error("node selector \"{raw}\" is not in the form key=value")]
    InvalidNodeSelector { raw: String },

    /// A load-generator job was requested for a graph with no entrypoint
    /// service.
    #[error("no service in the graph is marked as the entrypoint")]
    MissingEntrypoint,

    /// A load-generator job was requested for a graph with more than one
    /// entrypoint service.
    #[error("graph has {count} entrypoint services, expected exactly one")]
    MultipleEntrypoints { count: usize },
}

pub type Result<T> = std::result::Result<T, ManifestError>;
