//! Layered configuration for fox.
//!
//! Defaults, then TOML or JSON files, then `FOX__SECTION__KEY` environment
//! variables. Unknown fields are errors at every layer.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! body_limit = 4194304
//! read_timeout_secs = 30
//! max_header_size = 8192
//! shutdown_timeout_secs = 30
//! keep_alive = true
//!
//! [routing]
//! case_sensitive = false
//! strict_routing = false
//! unescape_path = true
//! string_mode = "zero_copy"
//! handle_method_not_allowed = true
//! handle_options = true
//! recover_panics = true
//! server_header = "fox"
//! pool_capacity = 1024
//!
//! [telemetry.logging]
//! level = "info,fox_core=debug"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//! ```
//!
//! # Example
//!
//! ```no_run
//! use fox_config::ConfigLoader;
//!
//! # fn main() -> Result<(), fox_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("fox.toml")?
//!     .with_env_prefix("FOX")
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/fox-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{
    FoxConfig, ServerSection, DEFAULT_BODY_LIMIT, DEFAULT_HTTP_ADDR, DEFAULT_MAX_HEADER_SIZE,
};
pub use error::ConfigError;
pub use loader::ConfigLoader;

pub use fox_core::{Settings, StringMode};
pub use fox_telemetry::{LogConfig, LogFormat, MetricsConfig, TelemetryConfig};
