//! The ordered route table.
//!
//! One stack per canonical method, each in registration order. `use` entries
//! and `all` routes are pushed onto every stack so that a single linear scan
//! of one stack sees middleware and endpoints interleaved exactly as they
//! were registered.
//!
//! The table is built before serving starts and is read-only afterwards,
//! so lookups need no locking.

use std::collections::HashSet;
use std::sync::Arc;

use http::Method;

use crate::error::RouteError;
use crate::method::{method_index, parse_method, METHODS, METHOD_COUNT};
use crate::pattern::Pattern;
use crate::policy::{RoutingPolicy, Span};
use crate::route::{Route, RouteMethod};

const GET: usize = 0;
const HEAD: usize = 1;

/// Per-method route stacks.
///
/// # Example
///
/// ```rust
/// use fox_router::{RouteTable, RoutingPolicy};
/// use http::Method;
///
/// let mut table: RouteTable<&str> = RouteTable::new(RoutingPolicy::default());
/// table.register("GET", "/x", vec!["get"]).unwrap();
/// table.register("POST", "/x", vec!["post"]).unwrap();
///
/// assert_eq!(
///     table.allowed_methods("/x"),
///     vec![Method::GET, Method::HEAD, Method::POST]
/// );
/// assert!(table.register("GET", "/x", vec!["again"]).is_err());
/// ```
pub struct RouteTable<H> {
    policy: RoutingPolicy,
    stacks: Vec<Vec<Arc<Route<H>>>>,
    routes: Vec<Arc<Route<H>>>,
    registered: HashSet<(usize, String)>,
    derived_heads: HashSet<String>,
    handler_count: usize,
}

impl<H> RouteTable<H> {
    /// Creates an empty table under `policy`.
    #[must_use]
    pub fn new(policy: RoutingPolicy) -> Self {
        Self {
            policy,
            stacks: (0..METHOD_COUNT).map(|_| Vec::new()).collect(),
            routes: Vec::new(),
            registered: HashSet::new(),
            derived_heads: HashSet::new(),
            handler_count: 0,
        }
    }

    /// The policy patterns were compiled under.
    #[must_use]
    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    /// Registers a route for a method given by name.
    ///
    /// `GET` also appends an equivalent `HEAD` entry sharing the same route.
    ///
    /// # Errors
    ///
    /// [`RouteError::UnknownMethod`], [`RouteError::EmptyHandlers`],
    /// [`RouteError::DuplicateRoute`] or any pattern compilation error.
    pub fn register(
        &mut self,
        method: &str,
        pattern: &str,
        handlers: Vec<H>,
    ) -> Result<Arc<Route<H>>, RouteError> {
        let method = parse_method(method).ok_or_else(|| RouteError::UnknownMethod {
            method: method.to_string(),
        })?;
        self.register_method(method, pattern, handlers)
    }

    /// Registers a route for `method`.
    ///
    /// # Errors
    ///
    /// Same as [`RouteTable::register`].
    pub fn register_method(
        &mut self,
        method: Method,
        pattern: &str,
        handlers: Vec<H>,
    ) -> Result<Arc<Route<H>>, RouteError> {
        let index = method_index(&method).ok_or_else(|| RouteError::UnknownMethod {
            method: method.to_string(),
        })?;
        let pattern = self.compile(&method.to_string(), pattern, &handlers)?;
        self.check_duplicate(index, &pattern)?;

        let normalized = pattern.normalized().to_string();
        let route = Arc::new(Route::new(RouteMethod::Exact(method), pattern, handlers));

        if index == HEAD && self.derived_heads.remove(&normalized) {
            self.replace_derived_head(&normalized, Arc::clone(&route));
        } else {
            self.stacks[index].push(Arc::clone(&route));
        }
        self.registered.insert((index, normalized.clone()));

        if index == GET && !self.registered.contains(&(HEAD, normalized.clone())) {
            self.stacks[HEAD].push(Arc::clone(&route));
            self.derived_heads.insert(normalized);
        }

        self.record(&route);
        Ok(route)
    }

    /// Registers a route on every canonical method.
    ///
    /// # Errors
    ///
    /// Fails without registering anything if any method already has the
    /// pattern.
    pub fn all(&mut self, pattern: &str, handlers: Vec<H>) -> Result<Arc<Route<H>>, RouteError> {
        let pattern = self.compile("ALL", pattern, &handlers)?;
        for index in 0..METHOD_COUNT {
            self.check_duplicate(index, &pattern)?;
        }

        let normalized = pattern.normalized().to_string();
        let route = Arc::new(Route::new(RouteMethod::All, pattern, handlers));

        for index in 0..METHOD_COUNT {
            if index == HEAD && self.derived_heads.remove(&normalized) {
                self.replace_derived_head(&normalized, Arc::clone(&route));
            } else {
                self.stacks[index].push(Arc::clone(&route));
            }
            self.registered.insert((index, normalized.clone()));
        }

        self.record(&route);
        Ok(route)
    }

    /// Registers prefix-matching middleware for every method.
    ///
    /// Middleware is never a duplicate: the same prefix may be used many times.
    ///
    /// # Errors
    ///
    /// [`RouteError::EmptyHandlers`] or any pattern compilation error.
    pub fn use_prefix(
        &mut self,
        prefix: &str,
        handlers: Vec<H>,
    ) -> Result<Arc<Route<H>>, RouteError> {
        let pattern = self.compile("USE", prefix, &handlers)?;
        let route = Arc::new(Route::new(RouteMethod::Use, pattern, handlers));
        for stack in &mut self.stacks {
            stack.push(Arc::clone(&route));
        }
        self.record(&route);
        Ok(route)
    }

    /// The ordered stack for a method index.
    #[must_use]
    pub fn stack(&self, index: usize) -> &[Arc<Route<H>>] {
        self.stacks.get(index).map_or(&[], Vec::as_slice)
    }

    /// Every route once, in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Arc<Route<H>>] {
        &self.routes
    }

    /// Total handlers across all registered routes.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handler_count
    }

    /// Methods, in canonical order, with a non-middleware route matching `path`.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut segments = Vec::new();
        let mut scratch = Vec::new();
        self.policy.split_path(path, &mut segments);
        self.allowed_methods_split(path, &segments, &mut scratch)
    }

    /// Like [`RouteTable::allowed_methods`] for a path that is already split.
    ///
    /// `scratch` is clobbered.
    pub fn allowed_methods_split(
        &self,
        path: &str,
        segments: &[Span],
        scratch: &mut Vec<Span>,
    ) -> Vec<Method> {
        let mut allowed = Vec::new();
        for (index, stack) in self.stacks.iter().enumerate() {
            let found = stack
                .iter()
                .any(|route| !route.is_middleware() && route.matches(path, segments, scratch));
            if found {
                allowed.push(METHODS[index].clone());
            }
        }
        scratch.clear();
        allowed
    }

    fn compile(&self, method: &str, pattern: &str, handlers: &[H]) -> Result<Pattern, RouteError> {
        if handlers.is_empty() {
            return Err(RouteError::EmptyHandlers {
                method: method.to_string(),
                pattern: pattern.to_string(),
            });
        }
        Pattern::compile(pattern, self.policy)
    }

    fn check_duplicate(&self, index: usize, pattern: &Pattern) -> Result<(), RouteError> {
        if self
            .registered
            .contains(&(index, pattern.normalized().to_string()))
        {
            return Err(RouteError::DuplicateRoute {
                method: METHODS[index].to_string(),
                pattern: pattern.raw().to_string(),
            });
        }
        Ok(())
    }

    fn replace_derived_head(&mut self, normalized: &str, route: Arc<Route<H>>) {
        let slot = self.stacks[HEAD].iter_mut().find(|existing| {
            existing.method() == &RouteMethod::Exact(Method::GET)
                && existing.pattern().normalized() == normalized
        });
        match slot {
            Some(slot) => *slot = route,
            None => self.stacks[HEAD].push(route),
        }
    }

    fn record(&mut self, route: &Arc<Route<H>>) {
        self.handler_count += route.handlers().len();
        self.routes.push(Arc::clone(route));
    }
}

impl<H> std::fmt::Debug for RouteTable<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("policy", &self.policy)
            .field("routes", &self.routes)
            .finish()
    }
}
