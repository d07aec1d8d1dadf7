//! In-memory test client.

use std::sync::Arc;

use bytes::Bytes;
use fox_core::{App, BuildError, Dispatcher};
use http::Method;
use serde::Serialize;

use crate::error::TestError;
use crate::request::TestRequestBuilder;
use crate::response::TestResponse;

/// Sends requests straight into a [`Dispatcher`], with no sockets involved.
///
/// ```
/// use fox_core::{handlers, App, Router};
/// use fox_test::TestClient;
///
/// # tokio_test::block_on(async {
/// let mut app = App::new();
/// app.get("/ping", handlers![|ctx| Box::pin(async move {
///     ctx.send_string("pong");
///     Ok(())
/// })]);
///
/// let client = TestClient::from_app(app).unwrap();
/// client.get("/ping").send().await.assert_body_eq("pong");
/// # });
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    dispatcher: Arc<Dispatcher>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client for `dispatcher`.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::shared(Arc::new(dispatcher))
    }

    /// Creates a client for a dispatcher that is also used elsewhere.
    pub fn shared(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            default_headers: Vec::new(),
        }
    }

    /// Builds `app` and creates a client for it.
    pub fn from_app(app: App) -> Result<Self, BuildError> {
        app.build().map(Self::new)
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// The dispatcher requests go to.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a HEAD request.
    pub fn head(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::HEAD, uri)
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts an OPTIONS request.
    pub fn options(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::OPTIONS, uri)
    }

    /// Starts a request with any method, including ones outside the
    /// standard set.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut builder = TestRequestBuilder::new(method, uri);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        TestClientRequest {
            client: self,
            builder,
        }
    }
}

/// A request being built by a [`TestClient`].
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Appends a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets `Content-Type`.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Appends a percent-encoded query parameter.
    pub fn query(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.query(key, value);
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Dispatches the request.
    ///
    /// # Panics
    ///
    /// Panics if the request could not be built; use
    /// [`try_send`](Self::try_send) to get the error instead.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(err) => panic!("test request failed: {err}"),
        }
    }

    /// Dispatches the request, returning build errors.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        let response = self.client.dispatcher.dispatch(request).await;
        Ok(TestResponse::from_http(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fox_core::{handlers, Router};
    use http::StatusCode;
    use serde_json::json;

    fn client() -> TestClient {
        let mut app = App::new();
        app.get(
            "/users/:id",
            handlers![|ctx| Box::pin(async move {
                let id = ctx.param_or("id", "").to_string();
                let auth = ctx.get_header("authorization").unwrap_or("none").to_string();
                ctx.json(&json!({ "id": id, "auth": auth }))
            })],
        );
        app.post(
            "/echo",
            handlers![|ctx| Box::pin(async move {
                let body = ctx.body().clone();
                ctx.status(StatusCode::CREATED).send(body);
                Ok(())
            })],
        );
        app.get(
            "/search",
            handlers![|ctx| Box::pin(async move {
                let q = ctx.query("q").unwrap_or_default().into_owned();
                ctx.send_string(&q);
                Ok(())
            })],
        );
        TestClient::from_app(app).unwrap()
    }

    #[tokio::test]
    async fn test_get_json() {
        let response = client().get("/users/7").send().await;
        response
            .assert_status(StatusCode::OK)
            .assert_json_eq(&json!({"id": "7", "auth": "none"}));
    }

    #[tokio::test]
    async fn test_default_headers() {
        let client = client().with_default_header("authorization", "Bearer t");
        let value: serde_json::Value = client.get("/users/1").send().await.json().unwrap();
        assert_eq!(value["auth"], "Bearer t");
    }

    #[tokio::test]
    async fn test_post_body() {
        client()
            .post("/echo")
            .json(&json!({"a": 1}))
            .send()
            .await
            .assert_status(StatusCode::CREATED)
            .assert_body_eq(r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_query_is_decoded() {
        client()
            .get("/search")
            .query("q", "red fox")
            .send()
            .await
            .assert_body_eq("red fox");
    }

    #[tokio::test]
    async fn test_try_send_reports_build_errors() {
        let result = client().get("/users/1").header("bad header", "x").try_send().await;
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }

    #[tokio::test]
    async fn test_from_app_reports_build_errors() {
        let mut app = App::new();
        app.get("/a/*/b", handlers![|_ctx| Box::pin(async move { Ok(()) })]);
        assert!(TestClient::from_app(app).is_err());
    }
}
