use axum::http::{HeaderMap, Method, Uri, Version};

/// Renders the inbound request line and headers as plain text, echoing the
/// wire-format dump the original handler wrote as its response body
/// (`request.Write`) — method, URI, and headers, no body.
pub fn dump_request(method: &Method, uri: &Uri, version: Version, headers: &HeaderMap) -> String {
    let mut out = format!("{method} {uri} {version:?}\r\n");
    for (name, value) in headers {
        let value = value.to_str().unwrap_or("<non-utf8>");
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str("\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumps_request_line_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "frontend".parse().unwrap());
        let dump = dump_request(&Method::GET, &"/".parse().unwrap(), Version::HTTP_11, &headers);
        assert!(dump.starts_with("GET / HTTP/1.1\r\n"));
        assert!(dump.contains("host: frontend\r\n"));
        assert!(dump.ends_with("\r\n\r\n"));
    }
}
