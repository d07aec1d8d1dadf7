//! Transport configuration.
//!
//! ```rust
//! use fox_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:3000")
//!     .read_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.http_addr(), "127.0.0.1:3000");
//! assert_eq!(config.body_limit(), 4 * 1024 * 1024);
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use fox_config::{ServerSection, DEFAULT_BODY_LIMIT, DEFAULT_HTTP_ADDR, DEFAULT_MAX_HEADER_SIZE};

/// Default seconds allowed to read a request body.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Default seconds to wait for connections on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Server configuration.
///
/// Build with [`ServerConfig::builder`] or convert from the `[server]`
/// section of a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    http_addr: String,
    body_limit: usize,
    read_timeout: Duration,
    max_header_size: usize,
    shutdown_timeout: Duration,
    keep_alive: bool,
}

impl ServerConfig {
    /// Creates a builder with default values.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Address to listen on.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Largest accepted request body, in bytes.
    #[must_use]
    pub fn body_limit(&self) -> usize {
        self.body_limit
    }

    /// Time allowed to read a request body.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Largest accepted request head, in bytes.
    #[must_use]
    pub fn max_header_size(&self) -> usize {
        self.max_header_size
    }

    /// Time to wait for in-flight connections on shutdown.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Whether connections stay open between requests.
    #[must_use]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&ServerSection> for ServerConfig {
    fn from(section: &ServerSection) -> Self {
        Self::builder()
            .http_addr(section.http_addr.clone())
            .body_limit(section.body_limit)
            .read_timeout(Duration::from_secs(section.read_timeout_secs))
            .max_header_size(section.max_header_size)
            .shutdown_timeout(Duration::from_secs(section.shutdown_timeout_secs))
            .keep_alive(section.keep_alive)
            .build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    body_limit: usize,
    read_timeout: Duration,
    max_header_size: usize,
    shutdown_timeout: Duration,
    keep_alive: bool,
}

impl ServerConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            keep_alive: true,
        }
    }

    /// Sets the listen address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the request body limit.
    #[must_use]
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Sets the body read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the request head limit.
    #[must_use]
    pub fn max_header_size(mut self, size: usize) -> Self {
        self.max_header_size = size;
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Enables or disables keep-alive.
    #[must_use]
    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = enabled;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            body_limit: self.body_limit,
            read_timeout: self.read_timeout,
            max_header_size: self.max_header_size,
            shutdown_timeout: self.shutdown_timeout,
            keep_alive: self.keep_alive,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
