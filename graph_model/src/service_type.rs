use std::fmt;

use serde::{Deserialize, Serialize};

/// The protocol a service speaks.
///
/// Serializes lower-case (`http`, `grpc`); the request engine currently only
/// ever issues HTTP calls, but the type is tracked so downstream lookups
/// know what they're emulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Http,
    Grpc,
}

impl Default for ServiceType {
    fn default() -> Self {
        ServiceType::Http
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceType::Http => write!(f, "http"),
            ServiceType::Grpc => write!(f, "grpc"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ServiceType::Http).unwrap(), "\"http\"");
        assert_eq!(serde_json::to_string(&ServiceType::Grpc).unwrap(), "\"grpc\"");
    }

    #[test]
    fn default_is_http() {
        assert_eq!(ServiceType::default(), ServiceType::Http);
    }
}
