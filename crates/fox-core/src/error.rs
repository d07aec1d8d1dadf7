//! Error types for fox.
//!
//! [`FoxError`] is what handlers return and what the error handler turns into
//! a response. Routing-level outcomes ("no route", "wrong method") are
//! variants of it, so an error handler sees them the same way it sees
//! handler failures.
//!
//! | Variant | Status |
//! |---|---|
//! | `NotFound` | 404 |
//! | `MethodNotAllowed` | 405 |
//! | `Http` | carried status |
//! | `Internal` | 500 |
//! | `Transport` | 431, 408, 413 or 400 |

use fox_router::RouteError;
use http::{Method, StatusCode};
use thiserror::Error;

/// Result type alias using [`FoxError`].
pub type FoxResult<T> = Result<T, FoxError>;

/// What every handler returns.
pub type HandlerResult = FoxResult<()>;

/// Transport-level failures detected before a request reaches routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportError {
    /// The request head exceeded the configured header limit.
    HeaderTooLarge,
    /// The client did not finish sending the request in time.
    Timeout,
    /// The request body exceeded the configured body limit.
    BodyTooLarge,
    /// Anything else the transport could not make sense of.
    BadRequest,
}

impl TransportError {
    /// The status a transport failure maps to.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::HeaderTooLarge => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BadRequest => StatusCode::BAD_REQUEST,
        }
    }

    /// Short label used in metrics and logs.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::HeaderTooLarge => "header_too_large",
            Self::Timeout => "timeout",
            Self::BodyTooLarge => "body_too_large",
            Self::BadRequest => "bad_request",
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(reason(self.status_code()))
    }
}

impl std::error::Error for TransportError {}

/// The error type handlers return.
///
/// # Example
///
/// ```
/// use fox_core::FoxError;
/// use http::StatusCode;
///
/// let err = FoxError::new(StatusCode::FORBIDDEN, "no access");
/// assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
/// assert_eq!(err.to_string(), "no access");
///
/// let err = FoxError::status(StatusCode::CONFLICT);
/// assert_eq!(err.to_string(), "Conflict");
/// ```
#[derive(Error, Debug)]
pub enum FoxError {
    /// No route matched the request.
    #[error("Cannot {method} {path}")]
    NotFound {
        /// Request method.
        method: String,
        /// Request path as received.
        path: String,
    },

    /// The path matched a route, but not for the request method.
    #[error("Method Not Allowed")]
    MethodNotAllowed {
        /// Methods with a matching route, in canonical order.
        allowed: Vec<Method>,
    },

    /// An error with an explicit status and message.
    #[error("{message}")]
    Http {
        /// Response status.
        status: StatusCode,
        /// Response body.
        message: String,
    },

    /// Internal failure.
    #[error("{message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The transport rejected the request.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl FoxError {
    /// Creates an error with a status and message.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates an error whose message is the status reason phrase.
    #[must_use]
    pub fn status(status: StatusCode) -> Self {
        Self::new(status, reason(status))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Http { status, .. } => *status,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Transport(err) => err.status_code(),
        }
    }

    /// True for the two routing outcomes, which are routine and not logged
    /// as failures.
    #[must_use]
    pub const fn is_routing(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::MethodNotAllowed { .. })
    }
}

impl From<anyhow::Error> for FoxError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for FoxError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal_with_source("failed to serialize response", err)
    }
}

impl From<http::Error> for FoxError {
    fn from(err: http::Error) -> Self {
        Self::internal_with_source("invalid header", err)
    }
}

/// Route registration failures collected while building an application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} route registration error(s): {}", .errors.len(), summarize(.errors))]
pub struct BuildError {
    /// Every failed registration, in registration order.
    pub errors: Vec<RouteError>,
}

fn summarize(errors: &[RouteError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown Status")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = FoxError::NotFound {
            method: "GET".to_string(),
            path: "/missing".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot GET /missing");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.is_routing());
    }

    #[test]
    fn test_method_not_allowed() {
        let err = FoxError::MethodNotAllowed {
            allowed: vec![Method::GET, Method::HEAD],
        };
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.to_string(), "Method Not Allowed");
    }

    #[test]
    fn test_status_uses_reason_phrase() {
        let err = FoxError::status(StatusCode::IM_A_TEAPOT);
        assert_eq!(err.to_string(), "I'm a teapot");
        assert_eq!(err.status_code(), StatusCode::IM_A_TEAPOT);
        assert!(!err.is_routing());
    }

    #[test]
    fn test_internal_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let err = FoxError::internal_with_source("write failed", io);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_anyhow() {
        let err: FoxError = anyhow::anyhow!("store unavailable").into();
        assert_eq!(err.to_string(), "store unavailable");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_transport_statuses() {
        let cases = [
            (TransportError::HeaderTooLarge, 431),
            (TransportError::Timeout, 408),
            (TransportError::BodyTooLarge, 413),
            (TransportError::BadRequest, 400),
        ];
        for (err, status) in cases {
            assert_eq!(FoxError::from(err).status_code().as_u16(), status);
        }
        assert_eq!(
            TransportError::HeaderTooLarge.to_string(),
            "Request Header Fields Too Large"
        );
    }

    #[test]
    fn test_build_error_display() {
        let err = BuildError {
            errors: vec![RouteError::DuplicateRoute {
                method: "GET".to_string(),
                pattern: "/a".to_string(),
            }],
        };
        assert_eq!(
            err.to_string(),
            "1 route registration error(s): route GET /a is already registered"
        );
    }
}
