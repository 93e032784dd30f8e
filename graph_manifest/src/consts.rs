//! Fixed names, ports, and paths shared by every generated manifest.
//!
//! Mirrors `consts.ServicePort` et al. from the original converter: these are
//! baked-in agreements between the generator and the request engine, not
//! configuration.

pub const SERVICE_GRAPH_NAMESPACE: &str = "service-graph";
pub const SERVICE_GRAPH_CONFIG_MAP_NAME: &str = "service-graph-config";
pub const SERVICE_GRAPH_CONFIG_MAP_KEY: &str = "service-graph";
pub const SERVICE_GRAPH_YAML_FILE_NAME: &str = "service-graph.yaml";
pub const CONFIG_PATH: &str = "/etc/config";
pub const SERVICE_NAME_ENV_KEY: &str = "SERVICE_NAME";
pub const SERVICE_CONTAINER_NAME: &str = "perf-test-service";
pub const SERVICE_PORT: u16 = 8080;

pub const CLIENT_CONTAINER_NAME: &str = "load-generator-client";
pub const CLIENT_NAME: &str = "client";
pub const CLIENT_METRICS_PORT: u16 = 42422;

pub const CONFIG_VOLUME_NAME: &str = "config-volume";

pub fn config_mount_path() -> String {
    format!("{CONFIG_PATH}/{SERVICE_GRAPH_YAML_FILE_NAME}")
}
