//! Access logging middleware.
//!
//! # Responsibilities
//! - Run the rest of the chain, catching any panic it raises
//! - Emit one structured event per request once the chain has returned
//! - Log request/response bodies when the body policy (or `?_debug`) asks
//!
//! # Design Decisions
//! - The event is emitted after `next()` returns, so status and sizes are final
//! - Body read failures land in the error slot instead of aborting the response
//! - Failed requests (error or 5xx) log at ERROR, the rest at INFO

use std::panic;
use std::sync::Arc;
use std::time::Instant;

use axum::http::{Method, StatusCode};
use tracing::Level;

use crate::config::LoggerConfig;
use crate::dispatch::{self, default_panic_handler, Context, Handler};
use crate::error::Error;
use crate::observability::metrics;

/// Predicate deciding whether a body is logged for a request.
pub type BodyPolicy = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Logger {
    panic_handler: Option<Handler>,
    should_log_req_body: Option<BodyPolicy>,
    should_log_res_body: Option<BodyPolicy>,
}

impl Logger {
    /// Logger with the default panic handler and the POST/PUT/DELETE body
    /// policy.
    pub fn new() -> Self {
        let policy: BodyPolicy = Arc::new(default_should_log_body);
        Self {
            panic_handler: Some(Handler::named("default_panic_handler", default_panic_handler)),
            should_log_req_body: Some(policy.clone()),
            should_log_res_body: Some(policy),
        }
    }

    pub fn from_config(config: &LoggerConfig) -> Self {
        Self {
            should_log_req_body: Some(methods_policy(&config.request_body_methods)),
            should_log_res_body: Some(methods_policy(&config.response_body_methods)),
            ..Self::new()
        }
    }

    /// `None` logs a panicked request, then leaves the panic to the router's
    /// panic handler.
    pub fn with_panic_handler(mut self, handler: Option<Handler>) -> Self {
        self.panic_handler = handler;
        self
    }

    pub fn with_request_body_policy(mut self, policy: Option<BodyPolicy>) -> Self {
        self.should_log_req_body = policy;
        self
    }

    pub fn with_response_body_policy(mut self, policy: Option<BodyPolicy>) -> Self {
        self.should_log_res_body = policy;
        self
    }

    pub fn into_handler(self) -> Handler {
        let logger = Arc::new(self);
        Handler::named("access_logger", move |ctx| logger.record(ctx))
    }

    /// Run the downstream chain and log the request.
    pub fn record(&self, ctx: &mut Context) {
        let debug = ctx.has_query("_debug");
        let start = Instant::now();

        let panicked = dispatch::catch_panic(ctx, Context::next);
        if let Some(message) = &panicked {
            ctx.halt();
            if ctx.error().is_none() {
                ctx.set_error(Error::HandlerPanic(message.clone()));
            }
            if let Some(handler) = &self.panic_handler {
                metrics::record_panic();
                handler.call(ctx);
            }
        }

        let mut entry = self.entry(ctx, debug, start);
        let rethrow = match panicked {
            Some(message) if self.panic_handler.is_none() => {
                // The router's panic handler answers with a server error.
                entry.status = StatusCode::INTERNAL_SERVER_ERROR.as_u16();
                Some(message)
            }
            _ => None,
        };
        metrics::record_request(&entry.method, entry.status, start);
        entry.emit();

        if let Some(message) = rethrow {
            panic::resume_unwind(Box::new(message));
        }
    }

    fn entry(&self, ctx: &mut Context, debug: bool, start: Instant) -> AccessEntry {
        let wants = |policy: &Option<BodyPolicy>| debug || policy.as_ref().is_some_and(|p| p(ctx));
        let log_req_body = wants(&self.should_log_req_body);
        let log_res_body = wants(&self.should_log_res_body);

        let req_body = if log_req_body {
            match ctx.request_body() {
                Ok(body) => Some(String::from_utf8_lossy(body).into_owned()),
                Err(err) => {
                    if ctx.error().is_none() {
                        ctx.set_error(err);
                    }
                    None
                }
            }
        } else {
            None
        };
        let res_body =
            log_res_body.then(|| String::from_utf8_lossy(ctx.response_body()).into_owned());

        AccessEntry {
            request_id: ctx.request_id().to_string(),
            host: ctx.host().unwrap_or_default().to_string(),
            method: ctx.method().to_string(),
            path: ctx.path().to_string(),
            raw_query: ctx.raw_query().to_string(),
            status: ctx.status().as_u16(),
            req_body_size: ctx.request_body_size(),
            res_body_size: ctx.response_body_size(),
            ip: ctx.client_addr().unwrap_or_default(),
            agent: ctx.user_agent().unwrap_or_default().to_string(),
            refer: ctx.referer().unwrap_or_default().to_string(),
            session: ctx.get("session").map(|s| s.to_string()),
            req_body,
            res_body,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            error: ctx.error().map(|e| e.to_string()),
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Log bodies of mutating requests: POST, PUT and DELETE.
pub fn default_should_log_body(ctx: &Context) -> bool {
    matches!(*ctx.method(), Method::POST | Method::PUT | Method::DELETE)
}

fn methods_policy(methods: &[String]) -> BodyPolicy {
    let methods: Vec<String> = methods.iter().map(|m| m.to_ascii_uppercase()).collect();
    Arc::new(move |ctx: &Context| methods.iter().any(|m| m == ctx.method().as_str()))
}

/// Fields of one access log event.
#[derive(Debug)]
struct AccessEntry {
    request_id: String,
    host: String,
    method: String,
    path: String,
    raw_query: String,
    status: u16,
    req_body_size: u64,
    res_body_size: usize,
    ip: String,
    agent: String,
    refer: String,
    session: Option<String>,
    req_body: Option<String>,
    res_body: Option<String>,
    duration_ms: f64,
    error: Option<String>,
}

macro_rules! access_event {
    ($level:expr, $entry:ident) => {
        tracing::event!(
            $level,
            request_id = %$entry.request_id,
            host = %$entry.host,
            method = %$entry.method,
            path = %$entry.path,
            raw_query = %$entry.raw_query,
            status = $entry.status,
            req_body_size = $entry.req_body_size,
            res_body_size = $entry.res_body_size,
            ip = %$entry.ip,
            agent = %$entry.agent,
            refer = %$entry.refer,
            session = $entry.session.as_deref(),
            req_body = $entry.req_body.as_deref(),
            res_body = $entry.res_body.as_deref(),
            duration_ms = $entry.duration_ms,
            error = $entry.error.as_deref(),
            "Request completed"
        )
    };
}

impl AccessEntry {
    fn failed(&self) -> bool {
        self.error.is_some() || self.status >= 500
    }

    fn emit(&self) {
        let entry = self;
        if entry.failed() {
            access_event!(Level::ERROR, entry);
        } else {
            access_event!(Level::INFO, entry);
        }
    }
}
