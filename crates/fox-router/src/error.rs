//! Registration errors.

use thiserror::Error;

/// Errors raised while compiling patterns or registering routes.
///
/// These are setup-time failures. Nothing in the request path produces a
/// `RouteError`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The pattern could not be parsed.
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `*` wildcard was followed by further segments.
    #[error("wildcard must be the last segment in '{pattern}'")]
    WildcardNotLast {
        /// The offending pattern.
        pattern: String,
    },

    /// Two parameters in one pattern share a name.
    #[error("duplicate parameter ':{name}' in '{pattern}'")]
    DuplicateParam {
        /// The offending pattern.
        pattern: String,
        /// The repeated parameter name.
        name: String,
    },

    /// The same method and normalized pattern were registered twice.
    #[error("route {method} {pattern} is already registered")]
    DuplicateRoute {
        /// The HTTP method.
        method: String,
        /// The pattern as registered.
        pattern: String,
    },

    /// A route was registered without any handler.
    #[error("route {method} {pattern} has no handlers")]
    EmptyHandlers {
        /// The HTTP method, or `USE`.
        method: String,
        /// The pattern as given.
        pattern: String,
    },

    /// The method is not one of the canonical verbs.
    #[error("unknown HTTP method '{method}'")]
    UnknownMethod {
        /// The method as given.
        method: String,
    },
}

impl RouteError {
    /// Creates an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}
