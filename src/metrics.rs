//! Prometheus plumbing: the rate-limit gauge families, request instrumentation
//! for both directions, and text exposition.

use crate::error::ExporterError;
use crate::types::{RateLimitReading, LABELS};
use prometheus::proto::MetricFamily;
use prometheus::{
    exponential_buckets, Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts,
    Registry, TextEncoder, DEFAULT_BUCKETS,
};
use std::time::Duration;

pub const NAMESPACE: &str = "gh_rate_limit_exporter";

/// Registry for process-wide families: request instrumentation in both
/// directions plus, on Linux, the `process_*` families read from `/proc`.
pub fn shared_registry() -> Result<Registry, prometheus::Error> {
    let registry = Registry::new();
    #[cfg(target_os = "linux")]
    registry.register(Box::new(
        prometheus::process_collector::ProcessCollector::for_self(),
    ))?;
    Ok(registry)
}

/// The three rate-limit families. They live in a private registry so that a
/// gather only ever sees what the owning collector has written.
pub struct RateLimitGauges {
    registry: Registry,
    total: GaugeVec,
    remaining: GaugeVec,
    usage: GaugeVec,
}

impl RateLimitGauges {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let total = gauge_vec(
            "rate_limit_total",
            "the upper limit of requests within the time unit the rate limit is applied on",
        )?;
        let remaining = gauge_vec(
            "rate_limit_remaining",
            "the amount of requests you can perform within the time unit the rate limit is applied on",
        )?;
        let usage = gauge_vec("rate_limit_usage", "(total - remaining) / total")?;
        registry.register(Box::new(total.clone()))?;
        registry.register(Box::new(remaining.clone()))?;
        registry.register(Box::new(usage.clone()))?;
        Ok(Self {
            registry,
            total,
            remaining,
            usage,
        })
    }

    /// Drop every series from all three families.
    pub fn reset(&self) {
        self.total.reset();
        self.remaining.reset();
        self.usage.reset();
    }

    pub fn observe(&self, reading: &RateLimitReading) {
        let labels = reading.label_values();
        self.total
            .with_label_values(&labels)
            .set(reading.limit as f64);
        self.remaining
            .with_label_values(&labels)
            .set(reading.remaining as f64);
        self.usage.with_label_values(&labels).set(reading.usage());
    }

    /// Snapshot of the non-empty families.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

fn gauge_vec(name: &str, help: &str) -> Result<GaugeVec, prometheus::Error> {
    GaugeVec::new(Opts::new(name, help).namespace(NAMESPACE), &LABELS)
}

/// Request count and latency for outbound GitHub API calls.
#[derive(Clone)]
pub struct HttpClientInstrumenter {
    requests: IntCounterVec,
    duration: HistogramVec,
}

impl HttpClientInstrumenter {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "http_client_request_duration_seconds",
                "HTTP client request latency histogram.",
            )
            .buckets(DEFAULT_BUCKETS.to_vec()),
            &["code", "method"],
        )?;
        let requests = IntCounterVec::new(
            Opts::new("http_client_requests_total", "HTTP client requests counter."),
            &["code", "method"],
        )?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(requests.clone()))?;
        Ok(Self { requests, duration })
    }

    /// Record one request. `status` is `None` when no response arrived.
    pub fn observe(&self, method: &str, status: Option<u16>, elapsed: Duration) {
        let code = status.map_or_else(|| "error".to_string(), |s| s.to_string());
        self.requests.with_label_values(&[code.as_str(), method]).inc();
        self.duration
            .with_label_values(&[code.as_str(), method])
            .observe(elapsed.as_secs_f64());
    }
}

/// Request count, latency and payload sizes for the scrape endpoint itself.
#[derive(Clone)]
pub struct HandlerInstrumenter {
    requests: IntCounterVec,
    duration: HistogramVec,
    request_size: HistogramVec,
    response_size: HistogramVec,
}

impl HandlerInstrumenter {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Tracks the number of HTTP requests."),
            &["handler", "method", "code"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Tracks the latencies for HTTP requests.",
            )
            .buckets(exponential_buckets(0.1, 1.5, 5)?),
            &["handler", "method", "code"],
        )?;
        let request_size = size_histogram(
            "http_request_size_bytes",
            "Tracks the size of HTTP requests.",
        )?;
        let response_size = size_histogram(
            "http_response_size_bytes",
            "Tracks the size of HTTP responses.",
        )?;
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(request_size.clone()))?;
        registry.register(Box::new(response_size.clone()))?;
        Ok(Self {
            requests,
            duration,
            request_size,
            response_size,
        })
    }

    pub fn observe(&self, handler: &str, method: &str, code: u16, elapsed: Duration) {
        let code = code.to_string();
        let labels = [handler, method, code.as_str()];
        self.requests.with_label_values(&labels).inc();
        self.duration
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
    }

    /// `request_bytes` is the declared body length, zero when none was sent.
    pub fn observe_sizes(
        &self,
        handler: &str,
        method: &str,
        code: u16,
        request_bytes: u64,
        response_bytes: u64,
    ) {
        let code = code.to_string();
        let labels = [handler, method, code.as_str()];
        self.request_size
            .with_label_values(&labels)
            .observe(request_bytes as f64);
        self.response_size
            .with_label_values(&labels)
            .observe(response_bytes as f64);
    }
}

// 256B .. 4MiB
fn size_histogram(name: &str, help: &str) -> Result<HistogramVec, prometheus::Error> {
    HistogramVec::new(
        HistogramOpts::new(name, help).buckets(exponential_buckets(256.0, 4.0, 8)?),
        &["handler", "method", "code"],
    )
}

/// Render families in the Prometheus text exposition format.
pub fn encode_text(families: &[MetricFamily]) -> Result<String, ExporterError> {
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(families, &mut buf)
        .map_err(|e| ExporterError::Encode(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| ExporterError::Encode(e.to_string()))
}
