use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// The exact header keys copied from an inbound request onto every outbound
/// request a script issues, so that tracing headers survive a fan-out.
pub const FORWARDABLE_HEADERS: &[&str] = &[
    "x-request-id",
    "x-b3-traceid",
    "x-b3-spanid",
    "x-b3-parentspanid",
    "x-b3-sampled",
    "x-b3-flags",
    "x-ot-span-context",
];

pub const PATH_TRACES_HEADER: &str = "Path-Traces";

/// Extracts the subset of `headers` that should be forwarded to downstream
/// calls. Only keys that are present are carried; axum's `HeaderMap` is
/// already case-insensitive on lookup.
pub fn forwardable_subset(headers: &HeaderMap) -> HeaderMap {
    let mut subset = HeaderMap::new();
    for key in FORWARDABLE_HEADERS {
        if let Some(value) = headers.get(*key) {
            let name = HeaderName::from_static(key);
            subset.insert(name, value.clone());
        }
    }
    subset
}

/// Every `Path-Traces` value on the response, treated as the inbound paths
/// collected from a downstream call.
pub fn collect_inbound_paths(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(PATH_TRACES_HEADER)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// The stamp this service prepends to every collected path: `"<name>
/// (<hostname>)"`, suffixed `" (ERROR)"` when stamping a locally-raised
/// error rather than a downstream one.
pub fn stamp(service_name: &str, hostname: &str, local_error: bool) -> String {
    if local_error {
        format!("{service_name} ({hostname}) (ERROR)")
    } else {
        format!("{service_name} ({hostname})")
    }
}

/// Produces the outbound `Path-Traces` values: the stamp alone if no inbound
/// paths were collected, otherwise the stamp prefixed onto each of them.
pub fn stamp_paths(stamp: &str, inbound_paths: &[String]) -> Vec<String> {
    if inbound_paths.is_empty() {
        vec![stamp.to_string()]
    } else {
        inbound_paths.iter().map(|p| format!("{stamp} {p}")).collect()
    }
}

/// Appends every value in `paths` as a separate `Path-Traces` header.
pub fn set_path_traces(headers: &mut HeaderMap, paths: &[String]) {
    for path in paths {
        if let Ok(value) = HeaderValue::from_str(path) {
            headers.append(HeaderName::from_static("path-traces"), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_only_the_known_subset() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        headers.insert("x-unrelated", HeaderValue::from_static("nope"));

        let subset = forwardable_subset(&headers);
        assert_eq!(subset.len(), 1);
        assert_eq!(subset.get("x-request-id").unwrap(), "abc");
    }

    #[test]
    fn stamp_without_inbound_paths_is_singleton() {
        let s = stamp("frontend", "pod-123", false);
        assert_eq!(stamp_paths(&s, &[]), vec!["frontend (pod-123)".to_string()]);
    }

    #[test]
    fn stamp_prefixes_every_inbound_path() {
        let s = stamp("frontend", "pod-123", false);
        let inbound = vec!["backend (pod-456)".to_string()];
        assert_eq!(stamp_paths(&s, &inbound), vec!["frontend (pod-123) backend (pod-456)".to_string()]);
    }

    #[test]
    fn local_error_is_suffixed() {
        assert_eq!(stamp("frontend", "pod-123", true), "frontend (pod-123) (ERROR)");
    }
}
