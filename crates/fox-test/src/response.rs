//! Test response wrapper.

use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// A dispatched response with assertion helpers.
///
/// The assertion methods panic with a descriptive message and return
/// `&Self` so they chain.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Wraps a dispatcher response.
    pub fn from_http(response: Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// Response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response status as a number.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// A header value as text.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// `Content-Type`, if present.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Methods listed in the `Allow` header, in header order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<&str> {
        self.header_str(header::ALLOW.as_str())
            .map(|allow| allow.split(',').map(str::trim).filter(|m| !m.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("invalid UTF-8: {e}")))
    }

    /// Body parsed as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Asserts the status.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "expected status {}, got {} with body {:?}",
            expected, self.status, self.body
        );
        self
    }

    /// Asserts a header value.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("header '{name}' not found"));
        assert_eq!(actual, expected, "header '{name}'");
        self
    }

    /// Asserts a header is absent.
    pub fn assert_no_header(&self, name: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        assert!(
            self.header(name).is_none(),
            "header '{name}' should be absent, got {:?}",
            self.header(name)
        );
        self
    }

    /// Asserts the body text.
    pub fn assert_body_eq(&self, expected: impl AsRef<str>) -> &Self {
        let body = self
            .text()
            .unwrap_or_else(|e| panic!("body should be text: {e}"));
        assert_eq!(body, expected.as_ref(), "body mismatch");
        self
    }

    /// Asserts the body text contains `expected`.
    pub fn assert_body_contains(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let body = self
            .text()
            .unwrap_or_else(|e| panic!("body should be text: {e}"));
        assert!(
            body.contains(expected),
            "body should contain '{expected}', got: {body}"
        );
        self
    }

    /// Asserts the body is empty.
    pub fn assert_empty_body(&self) -> &Self {
        assert!(self.body.is_empty(), "expected empty body, got {:?}", self.body);
        self
    }

    /// Asserts the body equals `expected` as JSON.
    pub fn assert_json_eq(&self, expected: &serde_json::Value) -> &Self {
        let actual: serde_json::Value = self
            .json()
            .unwrap_or_else(|e| panic!("body should be JSON: {e}"));
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: StatusCode, body: &'static str) -> TestResponse {
        TestResponse::from_http(
            Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .header("allow", "GET, HEAD, POST")
                .body(Bytes::from_static(body.as_bytes()))
                .unwrap(),
        )
    }

    #[test]
    fn test_accessors() {
        let response = response(StatusCode::CREATED, r#"{"id":1}"#);
        assert_eq!(response.status_code(), 201);
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.allowed_methods(), vec!["GET", "HEAD", "POST"]);
        assert_eq!(response.text().unwrap(), r#"{"id":1}"#);
    }

    #[test]
    fn test_json() {
        let response = response(StatusCode::OK, r#"{"name":"fox"}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["name"], "fox");
        response.assert_json_eq(&json!({"name": "fox"}));
    }

    #[test]
    fn test_assertions_chain() {
        response(StatusCode::OK, "hello")
            .assert_status(StatusCode::OK)
            .assert_header("allow", "GET, HEAD, POST")
            .assert_no_header("server")
            .assert_body_eq("hello")
            .assert_body_contains("ell");
    }

    #[test]
    #[should_panic(expected = "expected status")]
    fn test_assert_status_panics() {
        response(StatusCode::NOT_FOUND, "").assert_status(StatusCode::OK);
    }

    #[test]
    fn test_missing_allow() {
        let response = TestResponse::from_http(Response::new(Bytes::new()));
        assert!(response.allowed_methods().is_empty());
        response.assert_empty_body();
    }
}
