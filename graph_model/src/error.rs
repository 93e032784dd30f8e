use thiserror::Error;

/// Errors produced while parsing, validating, or serializing a topology
/// document.
///
/// Each variant is a distinct, matchable kind rather than an opaque string so
/// callers (tests included) can assert on the *kind* of failure, not just its
/// message.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The document could not be unmarshaled at all (bad YAML/JSON syntax,
    /// or a scalar that doesn't fit its target type).
    #[error("failed to parse topology document: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A service was declared with an empty or missing `name`.
    #[error("service has no name")]
    EmptyName,

    /// Two services in the same graph share a name.
    #[error("duplicate service name \"{name}\"")]
    DuplicateService { name: String },

    /// A `Percentage` value fell outside the closed interval [0, 1].
    #[error("percentage {value} is out of range [0, 1]")]
    OutOfRange { value: f64 },

    /// A `ByteSize` value was negative.
    #[error("byte size {value} must not be negative")]
    NegativeSize { value: i64 },

    /// A duration string (e.g. for a `sleep` command) did not parse.
    #[error("invalid duration \"{raw}\"")]
    InvalidDuration { raw: String },

    /// A byte-size string did not match any recognized bare-integer or
    /// human-readable form.
    #[error("invalid byte size \"{raw}\"")]
    InvalidByteSize { raw: String },

    /// An HTTP method string did not match any of the known methods.
    #[error("\"{raw}\" is not a valid HTTP method")]
    InvalidHttpMethod { raw: String },

    /// A command object had a key that is neither `sleep`, `call`, nor a
    /// known HTTP method.
    #[error("unknown command key \"{key}\"")]
    UnknownCommandKey { key: String },

    /// A command object had more than one key.
    #[error("command object has more than one key: {keys:?}")]
    MultipleKeysInCommand { keys: Vec<String> },

    /// A `Request` command names a service that does not exist in the graph.
    #[error("request targets undefined service \"{name}\"")]
    UndefinedService { name: String },

    /// A `Concurrent` command directly contains another `Concurrent`
    /// command.
    #[error("concurrent commands may not be nested")]
    NestedConcurrent,
}

pub type Result<T> = std::result::Result<T, GraphError>;
