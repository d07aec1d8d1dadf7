//! Prometheus metrics.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `fox_requests_total` | Counter | `method`, `status` | Requests answered |
//! | `fox_request_duration_seconds` | Histogram | `method` | Time from request head to response |
//! | `fox_in_flight_requests` | Gauge | - | Requests currently being dispatched |
//! | `fox_transport_errors_total` | Counter | `kind` | Requests rejected before routing |
//!
//! Recording is a no-op until [`init_metrics`] installs a recorder.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Counter of answered requests.
pub const REQUESTS_TOTAL: &str = "fox_requests_total";
/// Histogram of dispatch latency.
pub const REQUEST_DURATION_SECONDS: &str = "fox_request_duration_seconds";
/// Gauge of requests in progress.
pub const IN_FLIGHT_REQUESTS: &str = "fox_in_flight_requests";
/// Counter of transport rejections.
pub const TRANSPORT_ERRORS_TOTAL: &str = "fox_transport_errors_total";

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether to install a recorder.
    pub enabled: bool,

    /// Address of a standalone scrape endpoint. Without one, metrics are
    /// only available through [`render_metrics`].
    pub addr: Option<String>,

    /// Bucket bounds, in seconds, for the duration histogram.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: None,
            duration_buckets: vec![
                0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
            ],
        }
    }
}

/// Installs the global Prometheus recorder.
///
/// With an `addr`, a scrape listener is started on it; this must run inside
/// a Tokio runtime.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidAddress`] for an unparsable address and
/// [`TelemetryError::MetricsInit`] if the exporter cannot be installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    match &config.addr {
        Some(addr) => {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|e| TelemetryError::InvalidAddress(format!("{addr}: {e}")))?;
            builder
                .with_http_listener(addr)
                .install()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        }
        None => {
            let handle = builder
                .install_recorder()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            let _ = HANDLE.set(handle);
        }
    }

    describe_metrics();
    Ok(())
}

/// Renders the current metrics in Prometheus text format.
///
/// `None` unless [`init_metrics`] installed a recorder without a listener.
#[must_use]
pub fn render_metrics() -> Option<String> {
    HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Requests answered, by method and status");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time from request head to response"
    );
    describe_gauge!(IN_FLIGHT_REQUESTS, "Requests currently being dispatched");
    describe_counter!(
        TRANSPORT_ERRORS_TOTAL,
        "Requests rejected by the transport before routing"
    );
}

/// Records an answered request.
pub fn record_request(method: &str, status: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(duration.as_secs_f64());
}

/// Records a transport rejection.
pub fn record_transport_error(kind: &'static str) {
    counter!(TRANSPORT_ERRORS_TOTAL, "kind" => kind).increment(1);
}

/// Holds one slot of the in-flight gauge until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}
