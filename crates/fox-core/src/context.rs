//! Per-request context.
//!
//! A [`Context`] is the only thing a handler sees. It holds the request, the
//! routing cursor that [`Context::next`] advances, the captured parameters of
//! the currently executing route, a local value map for passing data down the
//! chain, and the response being built.
//!
//! Contexts are pooled. Everything a request writes is cleared by
//! [`Context::reset`] before the context serves another request, and nothing
//! borrowed from a context may outlive the handler call it was borrowed in.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use fox_router::{method_index, Route, RouteTable, Span};
use http::header::{AsHeaderName, HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, Request, Response, StatusCode};
use serde::Serialize;

use crate::dispatch::DispatchState;
use crate::error::{FoxError, HandlerResult};
use crate::handler::BoxedHandler;
use crate::settings::{Settings, StringMode};

pub(crate) const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// The per-request state handed to every handler.
pub struct Context {
    pub(crate) table: Arc<RouteTable<BoxedHandler>>,
    pub(crate) settings: Arc<Settings>,

    // Request
    pub(crate) method: Method,
    pub(crate) method_index: Option<usize>,
    pub(crate) original_url: String,
    pub(crate) path: String,
    pub(crate) segments: Vec<Span>,
    pub(crate) request_headers: HeaderMap,
    pub(crate) body: Bytes,

    // Routing cursor
    pub(crate) route: Option<Arc<Route<BoxedHandler>>>,
    pub(crate) cursor: Option<usize>,
    pub(crate) handler_index: usize,
    pub(crate) params: Vec<Span>,
    pub(crate) scratch: Vec<Span>,
    pub(crate) shared_params: Vec<Arc<str>>,
    pub(crate) matched: bool,
    pub(crate) state: DispatchState,
    pub(crate) error: Option<FoxError>,
    pub(crate) locals: HashMap<String, Box<dyn Any + Send + Sync>>,

    // Response
    pub(crate) status: StatusCode,
    pub(crate) response_headers: HeaderMap,
    pub(crate) response_body: BytesMut,
}

impl Context {
    pub(crate) fn new(table: Arc<RouteTable<BoxedHandler>>, settings: Arc<Settings>) -> Self {
        Self {
            table,
            settings,
            method: Method::GET,
            method_index: None,
            original_url: String::new(),
            path: String::new(),
            segments: Vec::new(),
            request_headers: HeaderMap::new(),
            body: Bytes::new(),
            route: None,
            cursor: None,
            handler_index: 0,
            params: Vec::new(),
            scratch: Vec::new(),
            shared_params: Vec::new(),
            matched: false,
            state: DispatchState::NotStarted,
            error: None,
            locals: HashMap::new(),
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_body: BytesMut::new(),
        }
    }

    /// A context with no routes behind it, for running handlers in
    /// isolation. Calling [`Context::next`] on it reports `404`.
    #[must_use]
    pub fn detached(settings: Settings) -> Self {
        let table = RouteTable::new(settings.routing_policy());
        Self::new(Arc::new(table), Arc::new(settings))
    }

    /// Loads a request into a freshly reset context.
    pub(crate) fn populate(&mut self, request: Request<Bytes>) {
        let (parts, body) = request.into_parts();

        self.method_index = method_index(&parts.method);
        self.method = parts.method;

        match parts.uri.path_and_query() {
            Some(path_and_query) => self.original_url.push_str(path_and_query.as_str()),
            None => self.original_url.push('/'),
        }

        let raw_path = split_url(&self.original_url).0;
        if self.settings.unescape_path && raw_path.contains('%') {
            match urlencoding::decode(raw_path) {
                Ok(decoded) => self.path.push_str(&decoded),
                Err(_) => self.path.push_str(raw_path),
            }
        } else {
            self.path.push_str(raw_path);
        }
        if self.path.is_empty() {
            self.path.push('/');
        }
        self.table.policy().split_path(&self.path, &mut self.segments);

        self.request_headers = parts.headers;
        self.body = body;
    }

    /// Clears every request-derived field.
    ///
    /// Buffers keep their capacity. The route table and settings are shared
    /// by every context of an application and are left alone.
    pub fn reset(&mut self) {
        self.method = Method::GET;
        self.method_index = None;
        self.original_url.clear();
        self.path.clear();
        self.segments.clear();
        self.request_headers.clear();
        self.body = Bytes::new();

        self.route = None;
        self.cursor = None;
        self.handler_index = 0;
        self.params.clear();
        self.scratch.clear();
        self.shared_params.clear();
        self.matched = false;
        self.state = DispatchState::NotStarted;
        self.error = None;
        self.locals.clear();

        self.status = StatusCode::OK;
        self.response_headers.clear();
        self.response_body.clear();
    }

    /// Moves the built response out, leaving the response side empty.
    pub(crate) fn take_response(&mut self) -> Response<Bytes> {
        let mut response = Response::new(self.response_body.split().freeze());
        *response.status_mut() = self.status;
        *response.headers_mut() = std::mem::take(&mut self.response_headers);
        response
    }

    // ----------------------------------------------------------------------
    // Request
    // ----------------------------------------------------------------------

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path and query exactly as received.
    #[must_use]
    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    /// The path routing ran against, percent-decoded when
    /// [`Settings::unescape_path`] is on.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path as received, before any decoding.
    #[must_use]
    pub fn raw_path(&self) -> &str {
        split_url(&self.original_url).0
    }

    /// The raw query string, without the `?`.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        split_url(&self.original_url).1
    }

    /// The first query value for `key`, percent-decoded.
    ///
    /// A key without `=` yields an empty value.
    #[must_use]
    pub fn query(&self, key: &str) -> Option<Cow<'_, str>> {
        self.query_string()?
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .find(|(name, _)| percent_decode(name) == key)
            .map(|(_, value)| percent_decode(value))
    }

    /// A request header as text. Headers that are not visible ASCII are
    /// reported as absent.
    #[must_use]
    pub fn get_header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.request_headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    /// All request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    /// The request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    // ----------------------------------------------------------------------
    // Routing
    // ----------------------------------------------------------------------

    /// The value of path parameter `name` in the currently executing route.
    ///
    /// A skipped optional parameter is `Some("")`. The wildcard capture is
    /// named `*`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        let index = self.route.as_ref()?.pattern().param_index(name)?;
        self.params.get(index).map(|span| span.as_str(&self.path))
    }

    /// Like [`Context::param`], with a fallback for missing or empty values.
    #[must_use]
    pub fn param_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.param(name) {
            Some(value) if !value.is_empty() => value,
            _ => default,
        }
    }

    /// The parameter as a shared string that may outlive the request.
    ///
    /// Under [`StringMode::Immutable`] this is a reference-count bump;
    /// otherwise the value is copied.
    #[must_use]
    pub fn param_shared(&self, name: &str) -> Option<Arc<str>> {
        let index = self.route.as_ref()?.pattern().param_index(name)?;
        match self.shared_params.get(index) {
            Some(shared) => Some(Arc::clone(shared)),
            None => self
                .params
                .get(index)
                .map(|span| Arc::from(span.as_str(&self.path))),
        }
    }

    /// Every parameter of the current route as `(name, value)` pairs.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        let names = self.route.as_ref().map_or(&[][..], |route| route.param_names());
        names
            .iter()
            .zip(&self.params)
            .map(|(name, span)| (name.as_str(), span.as_str(&self.path)))
    }

    /// The route whose handler is currently executing.
    #[must_use]
    pub fn route(&self) -> Option<&Route<BoxedHandler>> {
        self.route.as_deref()
    }

    /// True once a non-middleware route has matched.
    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.matched
    }

    /// Where dispatch stands for this request.
    #[must_use]
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// The error the chain failed with, once the error handler has run.
    #[must_use]
    pub fn error(&self) -> Option<&FoxError> {
        self.error.as_ref()
    }

    pub(crate) fn materialize_params(&mut self) {
        self.shared_params.clear();
        if self.settings.string_mode == StringMode::Immutable {
            let path = &self.path;
            self.shared_params
                .extend(self.params.iter().map(|span| Arc::from(span.as_str(path))));
        }
    }

    // ----------------------------------------------------------------------
    // Locals
    // ----------------------------------------------------------------------

    /// Stores a value for handlers further down the chain.
    pub fn set_local<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.locals.insert(key.into(), Box::new(value));
    }

    /// A value stored with [`Context::set_local`], if present with type `T`.
    #[must_use]
    pub fn local<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.locals.get(key)?.downcast_ref()
    }

    // ----------------------------------------------------------------------
    // Response
    // ----------------------------------------------------------------------

    /// Sets the response status.
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// The response status so far. Defaults to `200`.
    #[must_use]
    pub fn response_status(&self) -> StatusCode {
        self.status
    }

    /// Sets a response header, replacing any previous values.
    ///
    /// # Errors
    ///
    /// Fails if the name or value is not a valid header.
    pub fn set_header<K, V>(&mut self, name: K, value: V) -> HandlerResult
    where
        K: TryInto<HeaderName>,
        K::Error: Into<http::Error>,
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        let (name, value) = header_pair(name, value)?;
        self.response_headers.insert(name, value);
        Ok(())
    }

    /// Adds a response header value, keeping previous ones.
    ///
    /// # Errors
    ///
    /// Fails if the name or value is not a valid header.
    pub fn append_header<K, V>(&mut self, name: K, value: V) -> HandlerResult
    where
        K: TryInto<HeaderName>,
        K::Error: Into<http::Error>,
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        let (name, value) = header_pair(name, value)?;
        self.response_headers.append(name, value);
        Ok(())
    }

    /// A response header set so far.
    #[must_use]
    pub fn response_header<K: AsHeaderName>(&self, name: K) -> Option<&HeaderValue> {
        self.response_headers.get(name)
    }

    /// All response headers set so far.
    #[must_use]
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Replaces the response body.
    pub fn send(&mut self, body: impl AsRef<[u8]>) -> &mut Self {
        self.response_body.clear();
        self.response_body.extend_from_slice(body.as_ref());
        self
    }

    /// Replaces the response body with text, defaulting the content type to
    /// plain text.
    pub fn send_string(&mut self, body: &str) -> &mut Self {
        self.response_headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(TEXT_PLAIN));
        self.send(body)
    }

    /// Appends to the response body.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) -> &mut Self {
        self.response_body.extend_from_slice(chunk.as_ref());
        self
    }

    /// Replaces the response body with `value` as JSON.
    ///
    /// # Errors
    ///
    /// Fails if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> HandlerResult {
        let body = serde_json::to_vec(value)?;
        self.response_headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        self.send(body);
        Ok(())
    }

    /// The response body so far.
    #[must_use]
    pub fn response_body(&self) -> &[u8] {
        &self.response_body
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("route", &self.route.as_ref().map(|route| route.path()))
            .field("state", &self.state)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn split_url(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

fn percent_decode(text: &str) -> Cow<'_, str> {
    urlencoding::decode(text).unwrap_or(Cow::Borrowed(text))
}

fn header_pair<K, V>(name: K, value: V) -> Result<(HeaderName, HeaderValue), FoxError>
where
    K: TryInto<HeaderName>,
    K::Error: Into<http::Error>,
    V: TryInto<HeaderValue>,
    V::Error: Into<http::Error>,
{
    let name = name
        .try_into()
        .map_err(|err| FoxError::from(Into::<http::Error>::into(err)))?;
    let value = value
        .try_into()
        .map_err(|err| FoxError::from(Into::<http::Error>::into(err)))?;
    Ok((name, value))
}
