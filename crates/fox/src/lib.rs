//! # Fox
//!
//! Express-style routing for tokio and hyper: ordered middleware and route
//! chains, `:param`, `:optional?` and `*` patterns, and a `next()` cursor
//! that hands each request down the chain.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fox::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fox::Error> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("fox.toml")?
//!         .with_env_prefix("FOX")
//!         .load()?;
//!
//!     let mut app = App::with_settings(config.routing.clone());
//!     app.use_(handlers![|ctx| Box::pin(async move {
//!         ctx.set_header("x-powered-by", "fox")?;
//!         ctx.next().await
//!     })]);
//!     app.get("/users/:id", handlers![|ctx| Box::pin(async move {
//!         let id = ctx.param_or("id", "").to_string();
//!         ctx.send_string(&id);
//!         Ok(())
//!     })]);
//!
//!     fox::serve(app, &config).await
//! }
//! ```
//!
//! ## Crates
//!
//! | Module | Crate |
//! |---|---|
//! | [`router`] | patterns, matching and the route table |
//! | [`core`] | `App`, `Context`, the dispatcher and errors |
//! | [`server`] | the HTTP/1.1 transport |
//! | [`config`] | layered configuration |
//! | [`telemetry`] | logging and metrics |

#![doc(html_root_url = "https://docs.rs/fox/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use thiserror::Error;

pub use fox_config as config;
pub use fox_core as core;
pub use fox_router as router;
pub use fox_server as server;
pub use fox_telemetry as telemetry;

pub use fox_core::handlers;

/// Commonly used types.
pub mod prelude {
    pub use fox_config::{ConfigLoader, FoxConfig};
    pub use fox_core::{
        handler_fn, handlers, App, BoxedHandler, Context, Dispatcher, FoxError, FoxResult, Group,
        HandlerResult, Router, Settings, StringMode,
    };
    pub use fox_server::{Server, ServerConfig, ShutdownSignal};
}

/// Anything that can stop [`serve`].
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] fox_config::ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] fox_telemetry::TelemetryError),

    /// Route registration failed.
    #[error(transparent)]
    Build(#[from] fox_core::BuildError),

    /// The server failed to start or run.
    #[error(transparent)]
    Server(#[from] fox_server::ServerError),
}

/// Installs telemetry, builds `app` and serves it until SIGTERM or SIGINT.
///
/// The application's routing settings are its own; pass
/// `config.routing` to [`App::with_settings`](fox_core::App::with_settings)
/// when creating it to apply the configured ones.
pub async fn serve(app: fox_core::App, config: &fox_config::FoxConfig) -> Result<(), Error> {
    fox_telemetry::init_telemetry(&config.telemetry)?;
    let dispatcher = app.build()?;
    fox_server::Server::new(fox_server::ServerConfig::from(&config.server), dispatcher)
        .run()
        .await?;
    Ok(())
}
