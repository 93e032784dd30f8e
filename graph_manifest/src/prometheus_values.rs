//! Prometheus Helm-values fragment that relabels scraped metrics with the
//! topology labels from [`crate::labels::labels_for`].
//!
//! The original converter renders this from a Go `text/template` string.
//! Here the same document is built as typed structs and handed to
//! `serde_yaml`, consistent with the rest of this crate treating every
//! output document as data rather than a string template.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::consts::SERVICE_PORT;
use crate::error::Result;

const ISTIO_MIXER_TELEMETRY_PORT: u16 = 42422;

#[derive(Serialize)]
struct Selector {
    #[serde(rename = "matchLabels")]
    match_labels: BTreeMap<&'static str, &'static str>,
}

#[derive(Serialize)]
struct NamespaceSelector {
    #[serde(rename = "matchNames")]
    match_names: Vec<&'static str>,
}

#[derive(Serialize)]
struct MetricRelabeling {
    #[serde(rename = "targetLabel")]
    target_label: String,
    replacement: String,
}

#[derive(Serialize)]
struct ServiceMonitorEndpoint {
    #[serde(rename = "targetPort")]
    target_port: u16,
    #[serde(rename = "metricRelabelings")]
    metric_relabelings: Vec<MetricRelabeling>,
}

#[derive(Serialize)]
struct ServiceMonitor {
    name: &'static str,
    selector: Selector,
    #[serde(rename = "namespaceSelector")]
    namespace_selector: NamespaceSelector,
    endpoints: Vec<ServiceMonitorEndpoint>,
}

#[derive(Serialize)]
struct VolumeClaimTemplateSpec {
    #[serde(rename = "storageClassName")]
    storage_class_name: &'static str,
    #[serde(rename = "volumeName")]
    volume_name: &'static str,
    #[serde(rename = "accessModes")]
    access_modes: Vec<&'static str>,
    resources: VolumeClaimResources,
}

#[derive(Serialize)]
struct VolumeClaimResources {
    requests: BTreeMap<&'static str, &'static str>,
}

#[derive(Serialize)]
struct VolumeClaimTemplate {
    spec: VolumeClaimTemplateSpec,
}

#[derive(Serialize)]
struct StorageSpec {
    #[serde(rename = "volumeClaimTemplate")]
    volume_claim_template: VolumeClaimTemplate,
}

#[derive(Serialize)]
struct PrometheusValues {
    #[serde(rename = "serviceMonitors")]
    service_monitors: Vec<ServiceMonitor>,
    #[serde(rename = "storageSpec")]
    storage_spec: StorageSpec,
}

/// Renders the Helm-values YAML fragment for two `ServiceMonitor`s — one
/// scraping `app=service-graph` pods, one scraping the mesh sidecar's own
/// telemetry endpoint — each relabeling with `labels`.
pub fn labels_to_prometheus_values_yaml(labels: &BTreeMap<String, String>) -> Result<String> {
    let relabelings: Vec<MetricRelabeling> = labels
        .iter()
        .map(|(k, v)| MetricRelabeling { target_label: k.clone(), replacement: v.clone() })
        .collect();

    let values = PrometheusValues {
        service_monitors: vec![
            ServiceMonitor {
                name: "service-graph-monitor",
                selector: Selector {
                    match_labels: BTreeMap::from([("app", "service-graph")]),
                },
                namespace_selector: NamespaceSelector { match_names: vec!["service-graph"] },
                endpoints: vec![ServiceMonitorEndpoint {
                    target_port: SERVICE_PORT,
                    metric_relabelings: relabelings.clone(),
                }],
            },
            ServiceMonitor {
                name: "istio-mixer-monitor",
                selector: Selector { match_labels: BTreeMap::from([("istio", "mixer")]) },
                namespace_selector: NamespaceSelector { match_names: vec!["istio-system"] },
                endpoints: vec![ServiceMonitorEndpoint {
                    target_port: ISTIO_MIXER_TELEMETRY_PORT,
                    metric_relabelings: relabelings,
                }],
            },
        ],
        storage_spec: StorageSpec {
            volume_claim_template: VolumeClaimTemplate {
                spec: VolumeClaimTemplateSpec {
                    storage_class_name: "",
                    volume_name: "prometheus-persistent-volume",
                    access_modes: vec!["ReadWriteOnce"],
                    resources: VolumeClaimResources {
                        requests: BTreeMap::from([("storage", "10G")]),
                    },
                },
            },
        },
    };
    Ok(serde_yaml::to_string(&values)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_both_service_monitors_with_relabelings() {
        let mut labels = BTreeMap::new();
        labels.insert("topology_name".to_string(), "fanout".to_string());
        labels.insert("topology_hash".to_string(), "deadbeef".to_string());

        let yaml = labels_to_prometheus_values_yaml(&labels).unwrap();
        assert!(yaml.contains("service-graph-monitor"));
        assert!(yaml.contains("istio-mixer-monitor"));
        assert!(yaml.contains("topology_name"));
        assert!(yaml.contains("fanout"));
    }
}
