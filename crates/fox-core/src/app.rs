//! Application builder and request dispatcher.
//!
//! Routes are registered on an [`App`] (directly or through [`Group`]s),
//! then [`App::build`] freezes the route table into a [`Dispatcher`] that
//! serves requests concurrently. Registration errors are collected instead of
//! returned from every call, so route setup reads as a flat list and all
//! problems are reported together at build time.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use fox_router::{allow_header_value, join_paths, method_index, Route, RouteError, RouteTable};
use futures_util::FutureExt;
use http::header::{HeaderValue, ALLOW, SERVER};
use http::{Method, Request, Response, StatusCode};
use serde::Serialize;

use crate::context::Context;
use crate::dispatch::DispatchState;
use crate::error::{BuildError, FoxError, HandlerResult, TransportError};
use crate::handler::{default_error_handler, BoxedHandler, ErrorHandler};
use crate::pool::ContextPool;
use crate::settings::Settings;

/// Registration methods shared by [`App`] and [`Group`].
///
/// Every method records failures on the application instead of returning
/// them; see [`App::build`].
pub trait Router {
    /// Registers `handlers` for `method` on `path`.
    fn add(&mut self, method: &str, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self;

    /// Registers `handlers` on `path` for every method.
    fn all(&mut self, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self;

    /// Registers middleware for every path under `prefix`.
    fn use_at(&mut self, prefix: &str, handlers: Vec<BoxedHandler>) -> &mut Self;

    /// Opens a group of routes under `prefix`. Non-empty `handlers` are
    /// registered as middleware for the prefix.
    fn group(&mut self, prefix: &str, handlers: Vec<BoxedHandler>) -> Group<'_>;

    /// Registers middleware for every path.
    fn use_(&mut self, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.use_at("/", handlers)
    }

    /// Registers a `GET` route, which also serves `HEAD`.
    fn get(&mut self, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.add("GET", path, handlers)
    }

    /// Registers a `HEAD` route.
    fn head(&mut self, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.add("HEAD", path, handlers)
    }

    /// Registers a `POST` route.
    fn post(&mut self, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.add("POST", path, handlers)
    }

    /// Registers a `PUT` route.
    fn put(&mut self, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.add("PUT", path, handlers)
    }

    /// Registers a `DELETE` route.
    fn delete(&mut self, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.add("DELETE", path, handlers)
    }

    /// Registers a `CONNECT` route.
    fn connect(&mut self, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.add("CONNECT", path, handlers)
    }

    /// Registers an `OPTIONS` route.
    fn options(&mut self, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.add("OPTIONS", path, handlers)
    }

    /// Registers a `TRACE` route.
    fn trace(&mut self, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.add("TRACE", path, handlers)
    }

    /// Registers a `PATCH` route.
    fn patch(&mut self, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.add("PATCH", path, handlers)
    }
}

/// A registered route as reported by introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    /// The method, or `ALL` / `USE`.
    pub method: String,
    /// The pattern as registered.
    pub path: String,
    /// True for prefix-matching middleware.
    pub middleware: bool,
    /// Length of the handler chain.
    pub handlers: usize,
}

impl RouteInfo {
    fn from_route(route: &Route<BoxedHandler>) -> Self {
        Self {
            method: route.method().to_string(),
            path: route.path().to_string(),
            middleware: route.is_middleware(),
            handlers: route.handlers().len(),
        }
    }
}

/// The route registration surface.
///
/// # Example
///
/// ```
/// use fox_core::{handlers, App, Router};
///
/// let mut app = App::new();
/// app.get("/health", handlers![|ctx| Box::pin(async move {
///     ctx.send_string("ok");
///     Ok(())
/// })]);
///
/// let mut api = app.group("/api", Vec::new());
/// api.get("/users/:id", handlers![|ctx| Box::pin(async move {
///     let id = ctx.param_or("id", "").to_string();
///     ctx.send_string(&id);
///     Ok(())
/// })]);
///
/// assert_eq!(app.routes().len(), 2);
/// let dispatcher = app.build().unwrap();
/// assert_eq!(dispatcher.handler_count(), 2);
/// ```
pub struct App {
    table: RouteTable<BoxedHandler>,
    settings: Settings,
    error_handler: ErrorHandler,
    errors: Vec<RouteError>,
}

impl App {
    /// Creates an application with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Creates an application with `settings`.
    #[must_use]
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            table: RouteTable::new(settings.routing_policy()),
            settings,
            error_handler: Arc::new(default_error_handler),
            errors: Vec::new(),
        }
    }

    /// The application's settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the error handler.
    pub fn error_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context, &FoxError) + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Every registered route once, in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.table
            .routes()
            .iter()
            .map(|route| RouteInfo::from_route(route))
            .collect()
    }

    /// Total handlers across all routes.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.table.handler_count()
    }

    /// Registration failures collected so far.
    #[must_use]
    pub fn errors(&self) -> &[RouteError] {
        &self.errors
    }

    /// Freezes the route table.
    ///
    /// # Errors
    ///
    /// Returns every registration failure if there was at least one.
    pub fn build(self) -> Result<Dispatcher, BuildError> {
        if !self.errors.is_empty() {
            return Err(BuildError {
                errors: self.errors,
            });
        }

        let server_header = match self.settings.server_header.as_deref() {
            Some(value) => match HeaderValue::from_str(value) {
                Ok(header) => Some(header),
                Err(_) => {
                    tracing::warn!(value, "ignoring invalid server header");
                    None
                }
            },
            None => None,
        };

        let table = Arc::new(self.table);
        let settings = Arc::new(self.settings);
        tracing::debug!(
            routes = table.routes().len(),
            handlers = table.handler_count(),
            "route table built"
        );

        Ok(Dispatcher {
            pool: ContextPool::new(Arc::clone(&table), Arc::clone(&settings)),
            table,
            settings,
            error_handler: self.error_handler,
            server_header,
        })
    }

    /// Like [`App::build`], but logs every failure and exits the process.
    #[must_use]
    pub fn build_or_exit(self) -> Dispatcher {
        match self.build() {
            Ok(dispatcher) => dispatcher,
            Err(err) => {
                for error in &err.errors {
                    tracing::error!(error = %error, "route registration failed");
                }
                std::process::exit(1)
            }
        }
    }

    fn record(&mut self, result: Result<Arc<Route<BoxedHandler>>, RouteError>) {
        match result {
            Ok(route) => tracing::debug!(
                method = %route.method(),
                path = route.path(),
                handlers = route.handlers().len(),
                "route registered"
            ),
            Err(err) => self.errors.push(err),
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for App {
    fn add(&mut self, method: &str, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        let result = self.table.register(method, path, handlers);
        self.record(result);
        self
    }

    fn all(&mut self, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        let result = self.table.all(path, handlers);
        self.record(result);
        self
    }

    fn use_at(&mut self, prefix: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        let result = self.table.use_prefix(prefix, handlers);
        self.record(result);
        self
    }

    fn group(&mut self, prefix: &str, handlers: Vec<BoxedHandler>) -> Group<'_> {
        let prefix = join_paths("", prefix);
        if !handlers.is_empty() {
            self.use_at(&prefix, handlers);
        }
        Group { app: self, prefix }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("table", &self.table)
            .field("settings", &self.settings)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

/// Routes registered under a shared prefix.
///
/// Groups nest; each level joins its prefix onto its parent's.
pub struct Group<'a> {
    app: &'a mut App,
    prefix: String,
}

impl Group<'_> {
    /// The full prefix of this group.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Router for Group<'_> {
    fn add(&mut self, method: &str, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.app.add(method, &join_paths(&self.prefix, path), handlers);
        self
    }

    fn all(&mut self, path: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.app.all(&join_paths(&self.prefix, path), handlers);
        self
    }

    fn use_at(&mut self, prefix: &str, handlers: Vec<BoxedHandler>) -> &mut Self {
        self.app.use_at(&join_paths(&self.prefix, prefix), handlers);
        self
    }

    fn group(&mut self, prefix: &str, handlers: Vec<BoxedHandler>) -> Group<'_> {
        let prefix = join_paths(&self.prefix, prefix);
        self.app.group(&prefix, handlers)
    }
}

/// Serves requests against a frozen route table.
///
/// Shared across connection tasks behind an `Arc`; every method takes
/// `&self`.
pub struct Dispatcher {
    table: Arc<RouteTable<BoxedHandler>>,
    settings: Arc<Settings>,
    pool: ContextPool,
    error_handler: ErrorHandler,
    server_header: Option<HeaderValue>,
}

impl Dispatcher {
    /// Runs `request` through its handler chain and returns the response.
    ///
    /// Never fails: errors and routing misses are turned into responses by
    /// the error handler.
    pub async fn dispatch(&self, request: Request<Bytes>) -> Response<Bytes> {
        let started = Instant::now();
        let mut ctx = self.pool.acquire(request);

        match self.run_chain(&mut ctx).await {
            Ok(()) => ctx.settle(),
            Err(err) => self.handle_error(&mut ctx, err),
        }

        self.finish(ctx, started)
    }

    /// Answers a request the transport rejected before routing.
    ///
    /// The error handler runs on a context carrying the request head.
    pub fn fail_transport(
        &self,
        parts: http::request::Parts,
        error: TransportError,
    ) -> Response<Bytes> {
        let started = Instant::now();
        let mut ctx = self.pool.acquire(Request::from_parts(parts, Bytes::new()));
        self.handle_error(&mut ctx, FoxError::Transport(error));
        self.finish(ctx, started)
    }

    /// Every registered route once, in registration order.
    #[must_use]
    pub fn stack(&self) -> Vec<RouteInfo> {
        self.table
            .routes()
            .iter()
            .map(|route| RouteInfo::from_route(route))
            .collect()
    }

    /// Total handlers across all routes.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.table.handler_count()
    }

    /// The settings requests are served under.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The context pool.
    #[must_use]
    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    async fn run_chain(&self, ctx: &mut Context) -> HandlerResult {
        if !self.settings.recover_panics {
            return ctx.next().await;
        }

        match AssertUnwindSafe(ctx.next()).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    method = %ctx.method,
                    path = %ctx.path,
                    panic = message,
                    "handler panicked"
                );
                Err(FoxError::internal(message.to_string()))
            }
        }
    }

    fn handle_error(&self, ctx: &mut Context, err: FoxError) {
        ctx.state = DispatchState::ErrorRaised;

        if let FoxError::MethodNotAllowed { allowed } = &err {
            if ctx.method == Method::OPTIONS && self.settings.handle_options {
                let mut allowed = allowed.clone();
                if !allowed.contains(&Method::OPTIONS) {
                    allowed.push(Method::OPTIONS);
                    allowed.sort_by_key(method_index);
                }
                set_allow(ctx, &allowed);
                ctx.status(StatusCode::NO_CONTENT);
                ctx.response_body.clear();
                ctx.state = DispatchState::Finished;
                return;
            }
            set_allow(ctx, allowed);
        }

        if err.is_routing() {
            tracing::debug!(method = %ctx.method, path = %ctx.path, error = %err, "no route");
        } else {
            tracing::warn!(
                method = %ctx.method,
                path = %ctx.path,
                status = err.status_code().as_u16(),
                error = %err,
                "request failed"
            );
        }

        (self.error_handler)(ctx, &err);
        ctx.error = Some(err);
    }

    fn finish(&self, mut ctx: Box<Context>, started: Instant) -> Response<Bytes> {
        let mut response = ctx.take_response();
        if let Some(server) = &self.server_header {
            response
                .headers_mut()
                .entry(SERVER)
                .or_insert_with(|| server.clone());
        }

        tracing::debug!(
            method = %ctx.method,
            path = %ctx.path,
            status = response.status().as_u16(),
            state = ?ctx.state,
            elapsed = ?started.elapsed(),
            "request dispatched"
        );

        self.pool.release(ctx);
        response
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("table", &self.table)
            .field("settings", &self.settings)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

fn set_allow(ctx: &mut Context, methods: &[Method]) {
    if let Ok(value) = HeaderValue::from_str(&allow_header_value(methods)) {
        ctx.response_headers.insert(ALLOW, value);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("handler panicked")
}
