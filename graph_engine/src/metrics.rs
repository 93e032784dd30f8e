use prometheus::{HistogramVec, IntCounter, IntCounterVec, Registry};

/// Owns the process-wide Prometheus registry and the five metric families
/// exposed at `/metrics`. Constructed once at boot and shared behind an
/// `Arc` by every request handler.
pub struct Metrics {
    registry: Registry,
    pub incoming_requests_total: IntCounter,
    pub outgoing_requests_total: IntCounterVec,
    pub outgoing_request_size: HistogramVec,
    pub request_duration_seconds: HistogramVec,
    pub response_size: HistogramVec,
}

const SIZE_BUCKETS: &[f64] = &[
    1.0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9,
];

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let incoming_requests_total = IntCounter::new(
            "service_incoming_requests_total",
            "Total number of inbound requests handled.",
        )?;
        registry.register(Box::new(incoming_requests_total.clone()))?;

        let outgoing_requests_total = IntCounterVec::new(
            prometheus::Opts::new(
                "service_outgoing_requests_total",
                "Total number of outbound requests sent, by destination.",
            ),
            &["destination_service"],
        )?;
        registry.register(Box::new(outgoing_requests_total.clone()))?;

        let outgoing_request_size = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "service_outgoing_request_size",
                "Size in bytes of outbound request bodies, by destination.",
            )
            .buckets(SIZE_BUCKETS.to_vec()),
            &["destination_service"],
        )?;
        registry.register(Box::new(outgoing_request_size.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "service_request_duration_seconds",
                "Inbound request handling duration in seconds, by response code.",
            ),
            &["code"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let response_size = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "service_response_size",
                "Size in bytes of the response body, by response code.",
            )
            .buckets(SIZE_BUCKETS.to_vec()),
            &["code"],
        )?;
        registry.register(Box::new(response_size.clone()))?;

        Ok(Metrics {
            registry,
            incoming_requests_total,
            outgoing_requests_total,
            outgoing_request_size,
            request_duration_seconds,
            response_size,
        })
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn gather(&self) -> prometheus::Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&families, &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_all_five_families() {
        let metrics = Metrics::new().unwrap();
        metrics.incoming_requests_total.inc();
        metrics
            .outgoing_requests_total
            .with_label_values(&["backend"])
            .inc();
        metrics
            .outgoing_request_size
            .with_label_values(&["backend"])
            .observe(128.0);
        metrics.request_duration_seconds.with_label_values(&["200"]).observe(0.01);
        metrics.response_size.with_label_values(&["200"]).observe(256.0);

        let text = metrics.gather().unwrap();
        assert!(text.contains("service_incoming_requests_total"));
        assert!(text.contains("service_outgoing_requests_total"));
        assert!(text.contains("service_outgoing_request_size"));
        assert!(text.contains("service_request_duration_seconds"));
        assert!(text.contains("service_response_size"));
    }
}
