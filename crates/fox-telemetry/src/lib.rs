//! Observability for fox: structured logging and Prometheus metrics.
//!
//! - **Logging**: a `tracing` subscriber with JSON, pretty or compact output
//! - **Metrics**: request counters, latency histograms and an in-flight gauge
//!   through the `metrics` facade and a Prometheus exporter
//!
//! # Example
//!
//! ```rust,ignore
//! use fox_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     init_telemetry(&TelemetryConfig::default()).expect("telemetry");
//!     tracing::info!("ready");
//! }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

use serde::{Deserialize, Serialize};

pub use crate::error::TelemetryError;
pub use crate::logging::{init_logging, LogConfig, LogFormat};
pub use crate::metrics::{init_metrics, InFlightGuard, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Logging and metrics configuration together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Log subscriber settings.
    pub logging: LogConfig,
    /// Metrics recorder settings.
    pub metrics: MetricsConfig,
}

/// Installs logging, then metrics.
///
/// # Errors
///
/// Returns the first subsystem failure.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
