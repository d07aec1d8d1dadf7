//! Registered routes.

use std::fmt;

use http::Method;

use crate::matcher::MatchMode;
use crate::pattern::Pattern;
use crate::policy::Span;

/// Which requests a route applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMethod {
    /// One HTTP method, full-path matching.
    Exact(Method),
    /// Every canonical method, full-path matching.
    All,
    /// Every method, prefix matching. Registered through `use`.
    Use,
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(method) => f.write_str(method.as_str()),
            Self::All => f.write_str("ALL"),
            Self::Use => f.write_str("USE"),
        }
    }
}

/// One registered endpoint or middleware entry.
///
/// Routes are immutable once registered and shared between method stacks
/// through `Arc`, so a `GET` route and its derived `HEAD` entry are the same
/// object.
pub struct Route<H> {
    method: RouteMethod,
    pattern: Pattern,
    handlers: Vec<H>,
}

impl<H> Route<H> {
    pub(crate) fn new(method: RouteMethod, pattern: Pattern, handlers: Vec<H>) -> Self {
        Self {
            method,
            pattern,
            handlers,
        }
    }

    /// The method this route was registered for.
    #[must_use]
    pub fn method(&self) -> &RouteMethod {
        &self.method
    }

    /// True for `use` entries, which match by prefix.
    #[must_use]
    pub fn is_middleware(&self) -> bool {
        self.method == RouteMethod::Use
    }

    /// The compiled pattern.
    #[must_use]
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// The pattern as registered.
    #[must_use]
    pub fn path(&self) -> &str {
        self.pattern.raw()
    }

    /// Parameter names, aligned with captures.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        self.pattern.param_names()
    }

    /// The handler chain, in execution order.
    #[must_use]
    pub fn handlers(&self) -> &[H] {
        &self.handlers
    }

    /// The match mode implied by the route kind.
    #[must_use]
    pub fn match_mode(&self) -> MatchMode {
        if self.is_middleware() {
            MatchMode::Prefix
        } else {
            MatchMode::Full
        }
    }

    /// Matches a split request path against this route.
    pub fn matches(&self, path: &str, segments: &[Span], captures: &mut Vec<Span>) -> bool {
        self.pattern
            .matches(path, segments, self.match_mode(), captures)
    }
}

impl<H> fmt::Debug for Route<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.pattern.raw())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
