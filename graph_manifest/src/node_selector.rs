use std::collections::BTreeMap;

use crate::error::{ManifestError, Result};

/// Parses a single `key=value` node selector, e.g. `cloud.google.com/gke-nodepool=client-pool`.
pub fn parse_node_selector(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut parts = raw.splitn(2, '=');
    let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
        return Err(ManifestError::InvalidNodeSelector { raw: raw.to_string() });
    };
    if key.is_empty() || value.is_empty() {
        return Err(ManifestError::InvalidNodeSelector { raw: raw.to_string() });
    }
    let mut selector = BTreeMap::new();
    selector.insert(key.to_string(), value.to_string());
    Ok(selector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_pair() {
        let selector = parse_node_selector("pool=client-pool").unwrap();
        assert_eq!(selector.get("pool").unwrap(), "client-pool");
    }

    #[test]
    fn rejects_missing_equals() {
        assert!(parse_node_selector("pool").is_err());
    }

    #[test]
    fn rejects_empty_key_or_value() {
        assert!(parse_node_selector("=client-pool").is_err());
        assert!(parse_node_selector("pool=").is_err());
    }
}
