//! Per-request dispatch context.
//!
//! A [`Context`] owns the buffered request, the matched handler chain with
//! its cursor, the captured path values, a scratch store shared between
//! handlers, an error slot and the buffered response.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::request::Parts;
use axum::http::{Method, Request, StatusCode, Uri};
use axum::response::Response;
use serde::Serialize;
use serde_json::Value;

use crate::dispatch::Handler;
use crate::error::Error;
use crate::http::request::X_REQUEST_ID;

/// Where a request's handler chain stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// No handler has run yet.
    Pending,
    /// Dispatch is in progress.
    Running,
    /// Every handler was reached.
    Completed,
    /// A handler stopped the chain, or panicked.
    Aborted,
}

#[derive(Debug, Default)]
struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    /// Set by the first body write; status and headers are final after it.
    committed: bool,
}

pub struct Context {
    request: Parts,
    body: Result<Bytes, String>,
    remote_addr: Option<SocketAddr>,
    request_id: String,

    pre: Arc<[Handler]>,
    chain: Arc<[Handler]>,
    index: isize,
    finished: bool,
    faulted: bool,

    params: Vec<String>,
    param_names: Arc<[Option<String>]>,
    store: HashMap<String, Value>,
    error: Option<Error>,
    response: ResponseBuffer,
}

impl Context {
    /// Build a context around a fully buffered request.
    pub fn new(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::from_parts(parts, Ok(body))
    }

    /// Build a context from request parts and the outcome of buffering the
    /// body. A failed read surfaces later from [`Context::request_body`].
    pub fn from_parts(request: Parts, body: Result<Bytes, Error>) -> Self {
        let request_id = request
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self {
            request,
            body: body.map_err(|e| match e {
                Error::BodyRead(message) => message,
                other => other.to_string(),
            }),
            remote_addr: None,
            request_id,
            pre: Vec::new().into(),
            chain: Vec::new().into(),
            index: -1,
            finished: false,
            faulted: false,
            params: Vec::new(),
            param_names: Vec::new().into(),
            store: HashMap::new(),
            error: None,
            response: ResponseBuffer::default(),
        }
    }

    /// Attach the peer address of the connection.
    pub fn with_remote_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.remote_addr = addr;
        self
    }

    /// Replace the handler chain. The router does this after a lookup.
    pub fn with_handlers(mut self, handlers: impl IntoIterator<Item = Handler>) -> Self {
        self.chain = handlers.into_iter().collect::<Vec<_>>().into();
        self
    }

    pub(crate) fn bind(
        &mut self,
        pre: Arc<[Handler]>,
        chain: Arc<[Handler]>,
        params: Vec<String>,
        param_names: Arc<[Option<String>]>,
    ) {
        self.pre = pre;
        self.chain = chain;
        self.params = params;
        self.param_names = param_names;
        self.index = -1;
    }

    // ----- chain control -------------------------------------------------

    /// Advance to the next handler and run it. Returns once the downstream
    /// chain has returned. Past the last handler this does nothing.
    pub fn next(&mut self) {
        let total = self.chain_len() as isize;
        if self.index >= total {
            return;
        }
        self.index += 1;
        if let Some(handler) = self.handler_at(self.index) {
            handler.call(self);
        }
    }

    /// Number of handlers in the chain, global middleware included.
    pub fn chain_len(&self) -> usize {
        self.pre.len() + self.chain.len()
    }

    pub fn chain_state(&self) -> ChainState {
        if self.index < 0 {
            ChainState::Pending
        } else if !self.finished {
            ChainState::Running
        } else if self.faulted || self.index + 1 < self.chain_len() as isize {
            ChainState::Aborted
        } else {
            ChainState::Completed
        }
    }

    /// Stop the chain after a panic: later `next()` calls are no-ops.
    pub(crate) fn halt(&mut self) {
        self.faulted = true;
        self.index = self.chain_len() as isize;
    }

    pub(crate) fn finish(&mut self) {
        self.finished = true;
    }

    fn handler_at(&self, index: isize) -> Option<Handler> {
        let index = usize::try_from(index).ok()?;
        match index.checked_sub(self.pre.len()) {
            None => self.pre.get(index).cloned(),
            Some(offset) => self.chain.get(offset).cloned(),
        }
    }

    // ----- request -------------------------------------------------------

    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn uri(&self) -> &Uri {
        &self.request.uri
    }

    pub fn path(&self) -> &str {
        self.request.uri.path()
    }

    pub fn raw_query(&self) -> &str {
        self.request.uri.query().unwrap_or("")
    }

    /// True if the query string carries `key`, with or without a value.
    pub fn has_query(&self, key: &str) -> bool {
        url::form_urlencoded::parse(self.raw_query().as_bytes()).any(|(k, _)| k == key)
    }

    pub fn request_headers(&self) -> &HeaderMap {
        &self.request.headers
    }

    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.request.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn host(&self) -> Option<&str> {
        self.header(header::HOST).or_else(|| self.request.uri.host())
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header(header::USER_AGENT)
    }

    pub fn referer(&self) -> Option<&str> {
        self.header(header::REFERER)
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Client address: `X-Real-IP`, then the first `X-Forwarded-For` hop,
    /// then the peer address.
    pub fn client_addr(&self) -> Option<String> {
        if let Some(ip) = self.header("x-real-ip").filter(|v| !v.is_empty()) {
            return Some(ip.to_string());
        }
        if let Some(forwarded) = self.header("x-forwarded-for") {
            if let Some(first) = forwarded.split(',').map(str::trim).find(|v| !v.is_empty()) {
                return Some(first.to_string());
            }
        }
        self.remote_addr.map(|addr| addr.ip().to_string())
    }

    pub fn request_body(&self) -> Result<&[u8], Error> {
        match &self.body {
            Ok(bytes) => Ok(bytes),
            Err(message) => Err(Error::BodyRead(message.clone())),
        }
    }

    /// Declared `Content-Length`, or the buffered size when absent.
    pub fn request_body_size(&self) -> u64 {
        self.header(header::CONTENT_LENGTH)
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| self.body.as_ref().map_or(0, |b| b.len() as u64))
    }

    // ----- captures ------------------------------------------------------

    /// Captured values in left-to-right order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Capture declared as `:name` or `*name` in the route.
    pub fn param_named(&self, name: &str) -> Option<&str> {
        let index = self
            .param_names
            .iter()
            .position(|n| n.as_deref() == Some(name))?;
        self.param(index)
    }

    // ----- store and error slot ------------------------------------------

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.store.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.store.get(key)
    }

    pub fn set_error(&mut self, err: Error) {
        self.error = Some(err);
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    // ----- response ------------------------------------------------------

    /// Response status; 200 until something sets it.
    pub fn status(&self) -> StatusCode {
        self.response.status.unwrap_or(StatusCode::OK)
    }

    /// Set the status. Ignored once the body has started.
    pub fn write_header(&mut self, status: StatusCode) {
        if self.response.committed {
            tracing::debug!(
                request_id = %self.request_id,
                status = status.as_u16(),
                "Superfluous write_header after body"
            );
            return;
        }
        self.response.status = Some(status);
    }

    /// Set a response header. Ignored once the body has started.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if self.response.committed {
            return;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.response.headers.insert(name, value);
            }
            _ => tracing::warn!(request_id = %self.request_id, header = name, "Invalid response header"),
        }
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response.headers
    }

    /// Append to the response body, committing status and headers.
    pub fn write(&mut self, bytes: &[u8]) {
        self.response.committed = true;
        self.response.body.extend_from_slice(bytes);
    }

    pub fn json(&mut self, value: &impl Serialize) {
        self.json_with_code(value, StatusCode::OK);
    }

    /// Write `value` as JSON. A serialization failure is recorded in the
    /// error slot and answered with a bare 500.
    pub fn json_with_code(&mut self, value: &impl Serialize, status: StatusCode) {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.write_header(status);
                self.set_header("content-type", "application/json; charset=utf-8");
                self.write(&body);
            }
            Err(e) => {
                self.set_error(Error::Json(e));
                self.write_header(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }

    pub fn response_body(&self) -> &[u8] {
        &self.response.body
    }

    pub fn response_body_size(&self) -> usize {
        self.response.body.len()
    }

    /// Convert the buffered response for the transport.
    pub fn into_response(self) -> Response {
        let status = self.status();
        let mut response = Response::new(Body::from(self.response.body));
        *response.status_mut() = status;
        *response.headers_mut() = self.response.headers;
        response
    }
}
