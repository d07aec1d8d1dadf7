//! # Fox Core
//!
//! Request context, handler chains and the dispatcher for the fox web
//! framework.
//!
//! - [`App`] - route registration, collected into a [`Dispatcher`]
//! - [`Router`] - the registration methods shared by apps and [`Group`]s
//! - [`Context`] - per-request state, including [`Context::next`]
//! - [`Handler`] - what a route runs
//! - [`FoxError`] - what a handler fails with
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use fox_core::{handlers, App, Router};
//! use http::{Request, StatusCode};
//!
//! # tokio_test::block_on(async {
//! let mut app = App::new();
//! app.use_(handlers![|ctx| Box::pin(async move {
//!     ctx.set_header("x-powered-by", "fox")?;
//!     ctx.next().await
//! })]);
//! app.get("/:name", handlers![|ctx| Box::pin(async move {
//!     let greeting = format!("hello {}", ctx.param_or("name", "world"));
//!     ctx.send_string(&greeting);
//!     Ok(())
//! })]);
//!
//! let dispatcher = app.build().unwrap();
//! let request = Request::get("/fox").body(Bytes::new()).unwrap();
//! let response = dispatcher.dispatch(request).await;
//!
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.headers()["x-powered-by"], "fox");
//! assert_eq!(response.body().as_ref(), b"hello fox");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/fox-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod context;
mod dispatch;
mod error;
mod handler;
mod pool;
mod settings;

pub use app::{App, Dispatcher, Group, RouteInfo, Router};
pub use context::Context;
pub use dispatch::DispatchState;
pub use error::{BuildError, FoxError, FoxResult, HandlerResult, TransportError};
pub use handler::{default_error_handler, handler_fn, BoxFuture, BoxedHandler, ErrorHandler, Handler};
pub use pool::ContextPool;
pub use settings::{Settings, StringMode, DEFAULT_POOL_CAPACITY};
