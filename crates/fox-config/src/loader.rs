//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use fox_core::StringMode;
use fox_telemetry::LogFormat;
use serde_json::Value;

use crate::{ConfigError, FoxConfig};

/// Configuration loader.
///
/// Layers apply in order, each overriding only the keys it names:
/// 1. Default values (or a preset)
/// 2. Configuration files and strings (TOML or JSON)
/// 3. Environment variables
///
/// # Example
///
/// ```no_run
/// use fox_config::ConfigLoader;
///
/// # fn main() -> Result<(), fox_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("fox.toml")?
///     .with_env_prefix("FOX")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: FoxConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader holding the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: FoxConfig::default(),
            env_prefix: None,
        }
    }

    /// Reset to default values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = FoxConfig::default();
        self
    }

    /// Start from [`FoxConfig::development`].
    ///
    /// ```
    /// use fox_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = FoxConfig::development();
        self
    }

    /// Start from [`FoxConfig::production`].
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = FoxConfig::production();
        self
    }

    /// Layer a configuration file on top.
    ///
    /// The format follows the extension: `.toml` or `.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or unreadable, fails to
    /// parse, or names an unknown field.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some(format @ ("toml" | "json")) => self.with_string(&content, format),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    /// Layer a configuration file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Layer configuration text on top.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is not `toml` or
    /// `json`.
    ///
    /// # Example
    ///
    /// ```
    /// use fox_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [routing]
    ///     strict_routing = true
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(config.routing.strict_routing);
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => {
                // Parsed once as the typed config so unknown fields report
                // with TOML line information.
                toml::from_str::<FoxConfig>(content)?;
                toml::from_str(content)?
            }
            "json" => {
                serde_json::from_str::<FoxConfig>(content)?;
                serde_json::from_str(content)?
            }
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };

        let mut merged = serde_json::to_value(&self.config)?;
        merge(&mut merged, layer);
        self.config = serde_json::from_value(merged)?;
        Ok(self)
    }

    /// Read overrides from environment variables named
    /// `PREFIX__SECTION__KEY`, for example `FOX__SERVER__HTTP_ADDR` or
    /// `FOX__TELEMETRY__LOGGING__LEVEL`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file into the process environment, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a `.env` file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(err) if err.not_found() => Ok(self),
            Err(err) => Err(ConfigError::validation_error(format!(
                "failed to load .env: {err}"
            ))),
        }
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or the result
    /// does not validate.
    ///
    /// ```
    /// use fox_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().load().unwrap();
    /// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
    /// ```
    pub fn load(mut self) -> Result<FoxConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Return the configuration without environment overrides or
    /// validation.
    #[must_use]
    pub fn load_unvalidated(self) -> FoxConfig {
        self.config
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with(&marker))
            .collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let server = &mut self.config.server;
        let routing = &mut self.config.routing;
        let logging = &mut self.config.telemetry.logging;
        let metrics = &mut self.config.telemetry.metrics;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => server.http_addr = value.to_string(),
            ["SERVER", "BODY_LIMIT"] => server.body_limit = parse_number(key, value)?,
            ["SERVER", "READ_TIMEOUT_SECS"] => server.read_timeout_secs = parse_number(key, value)?,
            ["SERVER", "MAX_HEADER_SIZE"] => server.max_header_size = parse_number(key, value)?,
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "KEEP_ALIVE"] => server.keep_alive = parse_flag(key, value)?,

            ["ROUTING", "CASE_SENSITIVE"] => routing.case_sensitive = parse_flag(key, value)?,
            ["ROUTING", "STRICT_ROUTING"] => routing.strict_routing = parse_flag(key, value)?,
            ["ROUTING", "UNESCAPE_PATH"] => routing.unescape_path = parse_flag(key, value)?,
            ["ROUTING", "STRING_MODE"] => {
                routing.string_mode = match value.to_lowercase().as_str() {
                    "zero_copy" => StringMode::ZeroCopy,
                    "immutable" => StringMode::Immutable,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'zero_copy' or 'immutable'",
                        ))
                    }
                };
            }
            ["ROUTING", "HANDLE_METHOD_NOT_ALLOWED"] => {
                routing.handle_method_not_allowed = parse_flag(key, value)?;
            }
            ["ROUTING", "HANDLE_OPTIONS"] => routing.handle_options = parse_flag(key, value)?,
            ["ROUTING", "RECOVER_PANICS"] => routing.recover_panics = parse_flag(key, value)?,
            ["ROUTING", "SERVER_HEADER"] => {
                routing.server_header = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            ["ROUTING", "POOL_CAPACITY"] => routing.pool_capacity = parse_number(key, value)?,

            ["TELEMETRY", "LOGGING", "ENABLED"] => logging.enabled = parse_flag(key, value)?,
            ["TELEMETRY", "LOGGING", "LEVEL"] => logging.level = value.to_string(),
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    "compact" => LogFormat::Compact,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json', 'pretty' or 'compact'",
                        ))
                    }
                };
            }
            ["TELEMETRY", "LOGGING", "ANSI"] => logging.ansi = parse_flag(key, value)?,
            ["TELEMETRY", "LOGGING", "INCLUDE_LOCATION"] => {
                logging.include_location = parse_flag(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "INCLUDE_TARGET"] => {
                logging.include_target = parse_flag(key, value)?;
            }

            ["TELEMETRY", "METRICS", "ENABLED"] => metrics.enabled = parse_flag(key, value)?,
            ["TELEMETRY", "METRICS", "ADDR"] => {
                metrics.addr = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }

            [section @ .., field] => {
                return Err(ConfigError::unknown_field(
                    field.to_lowercase(),
                    section.join(".").to_lowercase(),
                ))
            }
            [] => return Err(ConfigError::env_parse_error(key, "invalid key format")),
        }

        Ok(())
    }
}

/// Overlays `layer` onto `base`. Tables merge key by key; anything else
/// replaces.
fn merge(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
