//! # Fox Test
//!
//! In-memory testing for fox applications. Requests go through the full
//! handler chain of a built [`fox_core::Dispatcher`], including middleware
//! and the error handler, without binding a port.
//!
//! ```
//! use fox_core::{handlers, App, Router};
//! use fox_test::TestClient;
//! use http::StatusCode;
//!
//! # tokio_test::block_on(async {
//! let mut app = App::new();
//! app.get("/x", handlers![|_ctx| Box::pin(async move { Ok(()) })]);
//! app.post("/x", handlers![|_ctx| Box::pin(async move { Ok(()) })]);
//!
//! let client = TestClient::from_app(app).unwrap();
//! let response = client.delete("/x").send().await;
//!
//! response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
//! assert_eq!(response.allowed_methods(), ["GET", "HEAD", "POST"]);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/fox-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::TestRequestBuilder;
pub use response::TestResponse;
