//! The handler chain cursor.
//!
//! [`Context::next`] is the whole dispatch algorithm. Each call resumes where
//! the previous one stopped: first the remaining handlers of the route that is
//! executing, then later entries of the method's stack. Middleware entries
//! match by prefix and endpoint entries must match the full path. The first
//! handler of the first matching entry runs the request; everything after it
//! runs only when something calls `next` again.

use std::sync::Arc;

use http::{Method, StatusCode};

use crate::context::Context;
use crate::error::{FoxError, HandlerResult};
use crate::handler::{BoxFuture, BoxedHandler};

/// Where a request stands in dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchState {
    /// No handler has run yet.
    NotStarted,
    /// A handler chain is executing.
    Running,
    /// A handler returned without calling `next`, ending the chain early.
    Aborted,
    /// The chain returned an error and the error handler ran.
    ErrorRaised,
    /// The stack was scanned to its end after a route matched.
    Finished,
}

impl Context {
    /// Runs the next handler in the chain.
    ///
    /// Returns what that handler returns. When nothing is left to run the
    /// result is `Ok(())` if a non-middleware route matched at some point,
    /// and otherwise a `404` or, when the path matches under other methods,
    /// a `405` listing them.
    ///
    /// # Example
    ///
    /// ```
    /// use fox_core::{handlers, App, Router};
    ///
    /// let mut app = App::new();
    /// app.use_(handlers![|ctx| Box::pin(async move {
    ///     ctx.set_header("x-seen", "1")?;
    ///     ctx.next().await
    /// })]);
    /// ```
    pub fn next(&mut self) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move {
            if self.state == DispatchState::NotStarted {
                self.state = DispatchState::Running;
            }

            if let Some(handler) = self.advance_within_route() {
                return handler.call(self).await;
            }

            let Some(index) = self.method_index else {
                return Err(FoxError::new(StatusCode::BAD_REQUEST, "Invalid http method"));
            };

            match self.advance_to_next_route(index) {
                Some(handler) => handler.call(self).await,
                None => self.exhausted(),
            }
        })
    }

    /// Settles the state after the chain returned `Ok`: a chain still
    /// `Running` stopped without calling `next`, so it was aborted.
    pub(crate) fn settle(&mut self) {
        if self.state == DispatchState::Running {
            self.state = DispatchState::Aborted;
        }
    }

    fn advance_within_route(&mut self) -> Option<BoxedHandler> {
        let route = self.route.as_ref()?;
        let next = self.handler_index + 1;
        let handler = Arc::clone(route.handlers().get(next)?);
        self.handler_index = next;
        Some(handler)
    }

    fn advance_to_next_route(&mut self, index: usize) -> Option<BoxedHandler> {
        let start = self.cursor.map_or(0, |cursor| cursor + 1);

        let found = {
            let stack = self.table.stack(index);
            let mut found = None;
            for (position, route) in stack.iter().enumerate().skip(start) {
                if route.matches(&self.path, &self.segments, &mut self.scratch) {
                    found = Some((position, Arc::clone(route)));
                    break;
                }
            }
            if found.is_none() {
                self.cursor = Some(stack.len());
            }
            found
        };

        let (position, route) = found?;
        let handler = Arc::clone(route.handlers().first()?);

        self.cursor = Some(position);
        self.handler_index = 0;
        if !route.is_middleware() {
            self.matched = true;
        }
        std::mem::swap(&mut self.params, &mut self.scratch);
        self.scratch.clear();
        self.route = Some(route);
        self.materialize_params();

        Some(handler)
    }

    fn exhausted(&mut self) -> HandlerResult {
        if self.matched {
            self.state = DispatchState::Finished;
            return Ok(());
        }

        let wants_allow = self.settings.handle_method_not_allowed
            || (self.settings.handle_options && self.method == Method::OPTIONS);
        if wants_allow {
            let allowed =
                self.table
                    .allowed_methods_split(&self.path, &self.segments, &mut self.scratch);
            if !allowed.is_empty() {
                return Err(FoxError::MethodNotAllowed { allowed });
            }
        }

        Err(FoxError::NotFound {
            method: self.method.to_string(),
            path: self.raw_path().to_string(),
        })
    }
}
