use std::collections::BTreeMap;
use std::path::Path;

use md5::{Digest, Md5};

use crate::error::Result;

/// Derives the `{topology_name, topology_hash}` pair used to tag Prometheus
/// metrics with which topology produced them: the file's name without
/// extension, and the hex MD5 of its raw bytes.
pub fn labels_for(topology_path: &Path) -> Result<BTreeMap<String, String>> {
    let contents = std::fs::read(topology_path)?;
    let topology_name = topology_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let topology_hash = hex::encode(Md5::digest(&contents));

    let mut labels = BTreeMap::new();
    labels.insert("topology_name".to_string(), topology_name);
    labels.insert("topology_hash".to_string(), topology_hash);
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_name_and_hash_from_file() {
        let dir = std::env::temp_dir();
        let path = dir.join("graph_manifest_labels_for_test.yaml");
        std::fs::write(&path, b"services: []\n").unwrap();

        let labels = labels_for(&path).unwrap();
        assert_eq!(
            labels.get("topology_name").unwrap(),
            "graph_manifest_labels_for_test"
        );
        assert_eq!(labels.get("topology_hash").unwrap().len(), 32);

        std::fs::remove_file(&path).ok();
    }
}
