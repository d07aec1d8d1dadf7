//! Handler trait for request processing.
//!
//! A handler receives the request [`Context`] and either finishes the
//! response, calls [`Context::next`] to hand control down the chain, or
//! returns an error. Middleware and endpoints are the same kind of thing;
//! what differs is how they were registered.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::header::{HeaderValue, CONTENT_TYPE};

use crate::context::{Context, TEXT_PLAIN};
use crate::error::{FoxError, HandlerResult};

/// A boxed, sendable future borrowing from `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A request handler.
///
/// Implemented for every closure of the right shape, so most handlers are
/// written with [`handler_fn`]. Implement it directly for handlers that
/// carry state.
///
/// # Example
///
/// ```
/// use fox_core::{BoxFuture, Context, Handler, HandlerResult};
///
/// struct Greeting(&'static str);
///
/// impl Handler for Greeting {
///     fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
///         Box::pin(async move {
///             ctx.send_string(self.0);
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Runs the handler against `ctx`.
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        (self)(ctx)
    }
}

/// A shared, type-erased handler as stored in route chains.
pub type BoxedHandler = Arc<dyn Handler>;

/// Wraps a closure as a [`BoxedHandler`].
///
/// ```
/// use fox_core::handler_fn;
///
/// let hello = handler_fn(|ctx| {
///     Box::pin(async move {
///         ctx.send_string("hello");
///         Ok(())
///     })
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F>(f: F) -> BoxedHandler
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Turns a list of closures into a handler chain.
///
/// ```
/// use fox_core::handlers;
///
/// let chain = handlers![
///     |ctx| Box::pin(async move { ctx.next().await }),
///     |ctx| Box::pin(async move {
///         ctx.send_string("done");
///         Ok(())
///     }),
/// ];
/// assert_eq!(chain.len(), 2);
/// ```
#[macro_export]
macro_rules! handlers {
    ($($handler:expr),* $(,)?) => {
        ::std::vec![$($crate::handler_fn($handler)),*]
    };
}

/// Turns an error into a response.
///
/// Runs with the context the failing chain ran on, so it can inspect the
/// request and overwrite whatever the chain had written.
pub type ErrorHandler = Arc<dyn Fn(&mut Context, &FoxError) + Send + Sync>;

/// Default error handler: the error's status and its message as plain text.
pub fn default_error_handler(ctx: &mut Context, err: &FoxError) {
    ctx.response_headers
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    ctx.status(err.status_code());
    ctx.send_string(&err.to_string());
}
