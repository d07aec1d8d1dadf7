//! Configuration types.
//!
//! [`FoxConfig`] is the root: a `[server]` section for the transport, a
//! `[routing]` section that is [`fox_core::Settings`] as-is, and a
//! `[telemetry]` section that is [`fox_telemetry::TelemetryConfig`] as-is.

use std::net::SocketAddr;

use fox_core::Settings;
use fox_telemetry::{LogConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default listen address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default request body limit (4 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 4 * 1024 * 1024;

/// Default request head limit (8 KiB).
pub const DEFAULT_MAX_HEADER_SIZE: usize = 8 * 1024;

/// Complete fox configuration.
///
/// # Example
///
/// ```
/// use fox_config::FoxConfig;
///
/// let config = FoxConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.routing.handle_method_not_allowed);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct FoxConfig {
    /// Transport settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Routing and dispatch switches.
    #[serde(default)]
    pub routing: Settings,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl FoxConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.body_limit == 0 {
            return Err(ConfigError::invalid_value(
                "server.body_limit",
                "must be greater than zero",
            ));
        }

        if self.server.max_header_size == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_header_size",
                "must be greater than zero",
            ));
        }

        if self.routing.pool_capacity == 0 {
            return Err(ConfigError::invalid_value(
                "routing.pool_capacity",
                "must be greater than zero",
            ));
        }

        if let Err(err) = fox_telemetry::logging::env_filter(&self.telemetry.logging.level) {
            return Err(ConfigError::invalid_value(
                "telemetry.logging.level",
                err.to_string(),
            ));
        }

        if let Some(addr) = &self.telemetry.metrics.addr {
            if addr.parse::<SocketAddr>().is_err() {
                return Err(ConfigError::invalid_value(
                    "telemetry.metrics.addr",
                    format!("invalid socket address: {addr}"),
                ));
            }
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, panics recovered.
    ///
    /// ```
    /// use fox_config::FoxConfig;
    ///
    /// let config = FoxConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// assert!(config.routing.recover_panics);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.http_addr = "127.0.0.1:8080".to_string();
        config.routing.recover_panics = true;
        config.telemetry.logging = LogConfig::development();
        config
    }

    /// Production preset: JSON logs, metrics recorder installed.
    ///
    /// ```
    /// use fox_config::FoxConfig;
    ///
    /// let config = FoxConfig::production();
    /// assert_eq!(config.telemetry.logging.format, fox_telemetry::LogFormat::Json);
    /// assert!(config.telemetry.metrics.enabled);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.routing.recover_panics = true;
        config.telemetry.logging = LogConfig::production();
        config.telemetry.metrics.enabled = true;
        config
    }
}

/// The `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Address to listen on.
    pub http_addr: String,

    /// Largest accepted request body, in bytes.
    pub body_limit: usize,

    /// Seconds allowed for reading a request body.
    pub read_timeout_secs: u64,

    /// Largest accepted request head, in bytes.
    pub max_header_size: usize,

    /// Seconds to wait for in-flight connections on shutdown.
    pub shutdown_timeout_secs: u64,

    /// Keep connections open between requests.
    pub keep_alive: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
            read_timeout_secs: 30,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            shutdown_timeout_secs: 30,
            keep_alive: true,
        }
    }
}
