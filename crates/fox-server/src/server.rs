//! HTTP/1.1 server.
//!
//! The server reads each request in full, enforcing the head and body
//! limits, and hands it to a [`Dispatcher`]. Requests rejected while
//! reading never reach routing; they are answered through
//! [`Dispatcher::fail_transport`] so the application's error handler still
//! shapes the response.
//!
//! # Example
//!
//! ```rust,no_run
//! use fox_core::{handlers, App, Router};
//! use fox_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = App::new();
//!     app.get("/", handlers![|ctx| Box::pin(async move {
//!         ctx.send_string("hello");
//!         Ok(())
//!     })]);
//!
//!     let config = ServerConfig::builder().http_addr("127.0.0.1:8080").build();
//!     Server::new(config, app.build()?).run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use fox_core::{Dispatcher, TransportError};
use fox_telemetry::metrics::{record_request, record_transport_error, InFlightGuard};
use http::header::CONTENT_LENGTH;
use http::request::Parts;
use http::{Request, Response};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Response body type written to the wire.
pub type ResponseBody = Full<Bytes>;

/// Serves a [`Dispatcher`] over HTTP/1.1.
pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Creates a server for `dispatcher`.
    #[must_use]
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self::with_shared(config, Arc::new(dispatcher))
    }

    /// Creates a server for a dispatcher that is also used elsewhere.
    #[must_use]
    pub fn with_shared(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    /// The server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The dispatcher requests are served by.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Runs until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and runs until `shutdown` triggers.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                reason: e.to_string(),
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve(listener, shutdown).await
    }

    /// Runs on an already bound listener until `shutdown` triggers.
    ///
    /// Stops accepting, asks open connections to finish their current
    /// request, and waits up to the shutdown timeout for them to close.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            addr = %local_addr,
            routes = self.dispatcher.stack().len(),
            "server listening"
        );

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();
        let mut stop = shutdown.recv();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(err) = server.handle_connection(stream, remote_addr, shutdown).await {
                                    tracing::debug!(remote = %remote_addr, error = %err, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "failed to accept connection");
                        }
                    }
                }

                () = &mut stop => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        let shutdown_timeout = server.config.shutdown_timeout();
        tracing::info!(
            timeout = ?shutdown_timeout,
            connections = tracker.active_connections(),
            "waiting for connections to close"
        );

        tokio::select! {
            () = tracker.wait_for_shutdown() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(shutdown_timeout) => {
                tracing::warn!(
                    connections = tracker.active_connections(),
                    "shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(req).await }
        });

        // The timer must be set for hyper to enforce the header deadline.
        let conn = http1::Builder::new()
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.read_timeout())
            .keep_alive(self.config.keep_alive())
            .serve_connection(io, service);
        tokio::pin!(conn);

        let mut stop = shutdown.recv();
        tokio::select! {
            result = conn.as_mut() => return result,
            () = &mut stop => {
                tracing::debug!(remote = %remote_addr, "closing connection for shutdown");
                conn.as_mut().graceful_shutdown();
            }
        }

        conn.await
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<ResponseBody>, Infallible> {
        let _in_flight = InFlightGuard::new();
        let started = Instant::now();
        let method = req.method().clone();

        let response = match self.read_request(req).await {
            Ok(request) => self.dispatcher.dispatch(request).await,
            Err((parts, error)) => {
                record_transport_error(error.kind());
                tracing::warn!(
                    method = %parts.method,
                    path = parts.uri.path(),
                    kind = error.kind(),
                    "request rejected by transport"
                );
                self.dispatcher.fail_transport(parts, error)
            }
        };

        record_request(method.as_str(), response.status().as_u16(), started.elapsed());
        Ok(response.map(Full::new))
    }

    /// Collects the body under the configured limits.
    async fn read_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Request<Bytes>, (Parts, TransportError)> {
        let (parts, body) = req.into_parts();

        if head_size(&parts) > self.config.max_header_size() {
            return Err((parts, TransportError::HeaderTooLarge));
        }

        let limit = self.config.body_limit();
        if declared_length(&parts).is_some_and(|len| len > limit) {
            return Err((parts, TransportError::BodyTooLarge));
        }

        let collected =
            tokio::time::timeout(self.config.read_timeout(), Limited::new(body, limit).collect())
                .await;

        match collected {
            Ok(Ok(collected)) => Ok(Request::from_parts(parts, collected.to_bytes())),
            Ok(Err(err)) if err.downcast_ref::<LengthLimitError>().is_some() => {
                Err((parts, TransportError::BodyTooLarge))
            }
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "failed to read request body");
                Err((parts, TransportError::BadRequest))
            }
            Err(_) => Err((parts, TransportError::Timeout)),
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Approximate size of the request head as sent: request line plus one
/// `name: value\r\n` per header.
fn head_size(parts: &Parts) -> usize {
    let target = parts
        .uri
        .path_and_query()
        .map_or(1, |pq| pq.as_str().len());
    let request_line = parts.method.as_str().len() + target + " HTTP/1.1\r\n".len() + 1;
    let headers: usize = parts
        .headers
        .iter()
        .map(|(name, value)| name.as_str().len() + value.len() + 4)
        .sum();
    request_line + headers
}

fn declared_length(parts: &Parts) -> Option<usize> {
    parts
        .headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fox_core::{handlers, App, FoxError, Router};
    use http::StatusCode;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn app() -> App {
        let mut app = App::new();
        app.get(
            "/hello/:name",
            handlers![|ctx| Box::pin(async move {
                let body = format!("hello {}", ctx.param_or("name", ""));
                ctx.send_string(&body);
                Ok(())
            })],
        );
        app.post(
            "/echo",
            handlers![|ctx| Box::pin(async move {
                let body = ctx.body().clone();
                ctx.send(body);
                Ok(())
            })],
        );
        app
    }

    async fn start(config: ServerConfig, app: App) -> (SocketAddr, ShutdownSignal) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let server = Server::new(config, app.build().unwrap());
        tokio::spawn(server.serve(listener, shutdown.clone()));
        (addr, shutdown)
    }

    async fn send(addr: SocketAddr, request: Request<Full<Bytes>>) -> Response<Bytes> {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .unwrap();
        tokio::spawn(conn);

        let response = sender.send_request(request).await.unwrap();
        let (parts, body) = response.into_parts();
        Response::from_parts(parts, body.collect().await.unwrap().to_bytes())
    }

    fn get(uri: &str) -> Request<Full<Bytes>> {
        Request::get(uri)
            .header("host", "localhost")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_serves_routes() {
        let (addr, shutdown) = start(ServerConfig::default(), app()).await;

        let response = send(addr, get("/hello/fox")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"hello fox");

        let response = send(addr, get("/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body().as_ref(), b"Cannot GET /missing");

        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_echoes_body() {
        let (addr, shutdown) = start(ServerConfig::default(), app()).await;

        let request = Request::post("/echo")
            .header("host", "localhost")
            .body(Full::new(Bytes::from_static(b"ping")))
            .unwrap();
        let response = send(addr, request).await;
        assert_eq!(response.body().as_ref(), b"ping");

        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_body_over_limit_is_413() {
        let config = ServerConfig::builder().body_limit(8).build();
        let (addr, shutdown) = start(config, app()).await;

        let request = Request::post("/echo")
            .header("host", "localhost")
            .body(Full::new(Bytes::from_static(b"far too long for the limit")))
            .unwrap();
        let response = send(addr, request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_header_over_limit_is_431() {
        let config = ServerConfig::builder().max_header_size(128).build();
        let (addr, shutdown) = start(config, app()).await;

        let request = Request::get("/hello/fox")
            .header("host", "localhost")
            .header("x-padding", "p".repeat(256))
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = send(addr, request).await;
        assert_eq!(response.status(), StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE);

        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_slow_body_is_408() {
        let config = ServerConfig::builder()
            .read_timeout(Duration::from_millis(50))
            .build();
        let (addr, shutdown) = start(config, app()).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"POST /echo HTTP/1.1\r\nhost: localhost\r\ncontent-length: 10\r\n\r\nabc")
            .await
            .unwrap();

        let mut buf = vec![0_u8; 256];
        let read = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf))
            .await
            .expect("server should answer")
            .unwrap();
        assert!(buf[..read].starts_with(b"HTTP/1.1 408"));

        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_slow_request_head_is_dropped() {
        let config = ServerConfig::builder()
            .read_timeout(Duration::from_millis(50))
            .build();
        let (addr, shutdown) = start(config, app()).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();

        let mut buf = vec![0_u8; 256];
        let result = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf))
            .await
            .expect("server should close the connection");
        match result {
            Ok(0) | Err(_) => {}
            Ok(read) => assert!(buf[..read].starts_with(b"HTTP/1.1 408")),
        }

        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_transport_errors_use_error_handler() {
        let mut app = app();
        app.error_handler(|ctx, err: &FoxError| {
            ctx.status(err.status_code());
            ctx.send_string(&format!("custom: {err}"));
        });
        let config = ServerConfig::builder().body_limit(1).build();
        let (addr, shutdown) = start(config, app).await;

        let request = Request::post("/echo")
            .header("host", "localhost")
            .body(Full::new(Bytes::from_static(b"xx")))
            .unwrap();
        let response = send(addr, request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.body().as_ref(), b"custom: Payload Too Large");

        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let config = ServerConfig::builder().http_addr("not-an-address").build();
        let server = Server::new(config, app().build().unwrap());

        let result = server.run_with_shutdown(ShutdownSignal::new()).await;
        assert!(matches!(result, Err(ServerError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_shutdown_stops_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig::builder()
            .shutdown_timeout(Duration::from_millis(100))
            .build();
        let server = Server::new(config, app().build().unwrap());
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_secs(5), server.serve(listener, shutdown))
            .await
            .expect("server should stop");
        assert!(result.is_ok());
    }

    #[test]
    fn test_head_size_counts_headers() {
        let (small, ()) = Request::get("/a").body(()).unwrap().into_parts();
        let (large, ()) = Request::get("/a")
            .header("x-large", "v".repeat(100))
            .body(())
            .unwrap()
            .into_parts();
        assert!(head_size(&large) >= head_size(&small) + 100);
    }

    #[test]
    fn test_declared_length() {
        let (parts, ()) = Request::post("/")
            .header(CONTENT_LENGTH, "42")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(declared_length(&parts), Some(42));

        let (parts, ()) = Request::post("/").body(()).unwrap().into_parts();
        assert_eq!(declared_length(&parts), None);
    }
}
