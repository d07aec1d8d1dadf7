//! # Fox Server
//!
//! Hyper-based HTTP/1.1 transport for fox.
//!
//! - [`Server`] - accept loop serving a built [`fox_core::Dispatcher`]
//! - [`ServerConfig`] - listen address, body and head limits, timeouts
//! - [`ShutdownSignal`] and [`ConnectionTracker`] - graceful shutdown
//!
//! Every response records `fox_requests_total` and
//! `fox_request_duration_seconds`; requests rejected while reading also
//! record `fox_transport_errors_total`.

#![doc(html_root_url = "https://docs.rs/fox-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod server;
mod shutdown;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_READ_TIMEOUT_SECS, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use error::ServerError;
pub use server::{ResponseBody, Server};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownReceiver, ShutdownSignal};
