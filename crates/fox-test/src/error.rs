//! Test error types.

use thiserror::Error;

/// Errors raised while building a test request or reading its response.
#[derive(Error, Debug)]
pub enum TestError {
    /// The request could not be built.
    #[error("request build error: {0}")]
    RequestBuild(String),

    /// A header name or value is invalid.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The response body is not what was asked for.
    #[error("body read error: {0}")]
    BodyRead(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = TestError::InvalidHeader("bad\nname".to_string());
        assert_eq!(err.to_string(), "invalid header: bad\nname");
    }

    #[test]
    fn test_json_source() {
        let json_err = serde_json::from_str::<u8>("x").unwrap_err();
        let err = TestError::from(json_err);
        assert!(std::error::Error::source(&err).is_some());
    }
}
