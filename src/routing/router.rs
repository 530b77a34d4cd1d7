//! Route registration, lookup and dispatch.
//!
//! # Responsibilities
//! - Own one tree per method plus a tree for method-agnostic routes
//! - Register routes, failing loudly on conflicts
//! - Look up (handler chain, captures) for a method and path
//! - Run the chain, or the not-found handler, with panic isolation
//!
//! # Design Decisions
//! - Built once at startup, read-only while serving (shared via `Arc`)
//! - The request method's tree is consulted before the wildcard tree
//! - A path that only reaches a waypoint is treated as not found
//! - Defaults (not-found, panic handler) are plain fields, not globals

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::{Method, StatusCode};

use crate::config::{RouteConfig, ServerConfig};
use crate::dispatch::{self, default_not_found, default_panic_handler, Context, Handler};
use crate::error::{Error, Result};
use crate::middleware::Logger;
use crate::observability::metrics;
use crate::routing::group::Group;
use crate::routing::pattern::{self, Segment};
use crate::routing::tree::{Match, Tree};

/// Method selector for registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMethod {
    /// Matches any request method.
    Any,
    Only(Method),
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        RouteMethod::Only(method)
    }
}

impl std::str::FromStr for RouteMethod {
    type Err = Error;

    /// `*` and `ANY` (any case) select every method.
    fn from_str(s: &str) -> Result<Self> {
        if s == "*" || s.eq_ignore_ascii_case("any") {
            return Ok(RouteMethod::Any);
        }
        Method::from_bytes(s.to_ascii_uppercase().as_bytes())
            .map(RouteMethod::Only)
            .map_err(|_| Error::InvalidMethod(s.to_string()))
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMethod::Any => f.write_str("ANY"),
            RouteMethod::Only(method) => write!(f, "{method}"),
        }
    }
}

/// A registered route: its pattern and terminal handler chain.
pub struct Route {
    pattern: String,
    handlers: Arc<[Handler]>,
    param_names: Arc<[Option<String>]>,
}

impl Route {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.pattern, self.handlers)
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'r, 'p> {
    pub route: &'r Route,
    pub captures: Vec<&'p str>,
}

pub struct Router {
    trees: HashMap<Method, Tree<Route>>,
    any: Tree<Route>,
    middleware: Arc<[Handler]>,
    not_found: Handler,
    panic_handler: Handler,
}

impl Router {
    /// An empty router with the default not-found and panic handlers.
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
            any: Tree::new(),
            middleware: Vec::new().into(),
            not_found: Handler::named("default_not_found", default_not_found),
            panic_handler: Handler::named("default_panic_handler", default_panic_handler),
        }
    }

    /// Build a router from configuration: the access logger (when enabled)
    /// followed by every configured fixed-response route.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let mut router = Self::new();
        if config.logger.enabled {
            router.use_handlers([Logger::from_config(&config.logger).into_handler()]);
        }
        for route in &config.routes {
            let method: RouteMethod = route.method.parse()?;
            router.register(method, &route.path, [fixed_response(route)])?;
        }
        tracing::info!(routes = config.routes.len(), "Router built from configuration");
        Ok(router)
    }

    /// Append global middleware, run before every matched route's chain.
    pub fn use_handlers(&mut self, handlers: impl IntoIterator<Item = Handler>) {
        let mut all = self.middleware.to_vec();
        all.extend(handlers);
        self.middleware = all.into();
    }

    /// Replace the handler run when no route matches.
    pub fn not_found(&mut self, handler: Handler) {
        self.not_found = handler;
    }

    /// Replace the handler run when a handler panics.
    pub fn panic_handler(&mut self, handler: Handler) {
        self.panic_handler = handler;
    }

    /// Register `handlers` for `method` and `pattern`.
    pub fn register(
        &mut self,
        method: impl Into<RouteMethod>,
        pattern: &str,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> Result<()> {
        let method = method.into();
        let segments = pattern::parse(pattern)?;
        self.insert(method, pattern, &segments, handlers.into_iter().collect())
    }

    /// Register a path matched byte for byte; marker characters are literal.
    pub fn register_literal(
        &mut self,
        method: impl Into<RouteMethod>,
        path: &str,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> Result<()> {
        let method = method.into();
        self.insert(method, path, &pattern::literal(path), handlers.into_iter().collect())
    }

    fn insert(
        &mut self,
        method: RouteMethod,
        pattern: &str,
        segments: &[Segment],
        handlers: Vec<Handler>,
    ) -> Result<()> {
        if !pattern.starts_with('/') {
            return Err(Error::invalid_pattern(pattern, "route must start with '/'"));
        }
        if handlers.is_empty() {
            return Err(Error::EmptyHandlerChain(format!("{method} {pattern}")));
        }
        let route = Route {
            pattern: pattern.to_string(),
            handlers: handlers.into(),
            param_names: pattern::capture_names(segments).into(),
        };
        let tree = match &method {
            RouteMethod::Any => &mut self.any,
            RouteMethod::Only(m) => self.trees.entry(m.clone()).or_default(),
        };
        tree.insert_segments(pattern, segments, route).map_err(|err| match err {
            Error::RouteConflict(_) => Error::RouteConflict(format!("{method} {pattern}")),
            other => other,
        })?;
        tracing::debug!(method = %method, pattern, "Route registered");
        Ok(())
    }

    pub fn get(&mut self, pattern: &str, handlers: impl IntoIterator<Item = Handler>) -> Result<()> {
        self.register(Method::GET, pattern, handlers)
    }

    pub fn post(&mut self, pattern: &str, handlers: impl IntoIterator<Item = Handler>) -> Result<()> {
        self.register(Method::POST, pattern, handlers)
    }

    pub fn put(&mut self, pattern: &str, handlers: impl IntoIterator<Item = Handler>) -> Result<()> {
        self.register(Method::PUT, pattern, handlers)
    }

    pub fn patch(&mut self, pattern: &str, handlers: impl IntoIterator<Item = Handler>) -> Result<()> {
        self.register(Method::PATCH, pattern, handlers)
    }

    pub fn delete(&mut self, pattern: &str, handlers: impl IntoIterator<Item = Handler>) -> Result<()> {
        self.register(Method::DELETE, pattern, handlers)
    }

    pub fn any(&mut self, pattern: &str, handlers: impl IntoIterator<Item = Handler>) -> Result<()> {
        self.register(RouteMethod::Any, pattern, handlers)
    }

    /// Routes registered through the group share `base_path` and have
    /// `handlers` prepended to their chains.
    pub fn group(&mut self, base_path: &str, handlers: impl IntoIterator<Item = Handler>) -> Group<'_> {
        Group::new(self, base_path, handlers.into_iter().collect())
    }

    /// Find the route for `method` and `path`.
    pub fn lookup<'r, 'p>(&'r self, method: &Method, path: &'p str) -> Option<RouteMatch<'r, 'p>> {
        let outcome = match self.trees.get(method).map(|tree| tree.lookup(path)) {
            Some(found @ Match::Found { .. }) => found,
            _ => self.any.lookup(path),
        };
        match outcome {
            Match::Found { value, captures } => Some(RouteMatch {
                route: value,
                captures,
            }),
            Match::Structural => {
                tracing::trace!(%method, path, "Path reaches a waypoint without a route");
                None
            }
            Match::NotFound => None,
        }
    }

    /// Look up the request's route and run its chain, or the not-found
    /// handler. Handler panics are contained here.
    pub fn handle(&self, ctx: &mut Context) {
        let matched = self.lookup(ctx.method(), ctx.path()).map(|m| {
            let captures = m.captures.into_iter().map(str::to_string).collect::<Vec<_>>();
            (Arc::clone(&m.route.handlers), Arc::clone(&m.route.param_names), captures)
        });

        match matched {
            Some((chain, names, captures)) => {
                ctx.bind(Arc::clone(&self.middleware), chain, captures, names);
                self.run_guarded(ctx, Context::next);
            }
            None => {
                tracing::debug!(method = %ctx.method(), path = ctx.path(), "No route matched");
                metrics::record_not_found(ctx.method().as_str());
                let not_found = self.not_found.clone();
                self.run_guarded(ctx, |ctx| not_found.call(ctx));
            }
        }
        ctx.finish();
    }

    fn run_guarded(&self, ctx: &mut Context, run: impl FnOnce(&mut Context)) {
        let Some(message) = dispatch::catch_panic(ctx, run) else {
            return;
        };
        ctx.halt();
        tracing::error!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = ctx.path(),
            panic = %message,
            "Handler panicked"
        );
        metrics::record_panic();
        if ctx.error().is_none() {
            ctx.set_error(Error::HandlerPanic(message));
        }
        let panic_handler = self.panic_handler.clone();
        if let Some(message) = dispatch::catch_panic(ctx, |ctx| panic_handler.call(ctx)) {
            tracing::error!(panic = %message, "Panic handler panicked");
            ctx.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.trees.iter().collect();
        methods.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        for (method, tree) in methods {
            writeln!(f, "{method}:\n{tree}")?;
        }
        if !self.any.is_empty() {
            writeln!(f, "ANY:\n{}", self.any)?;
        }
        Ok(())
    }
}

fn fixed_response(route: &RouteConfig) -> Handler {
    let status = StatusCode::from_u16(route.status).unwrap_or(StatusCode::OK);
    let body = route.body.clone();
    let content_type = route.content_type.clone();
    Handler::named("fixed_response", move |ctx| {
        ctx.write_header(status);
        ctx.set_header("content-type", &content_type);
        ctx.write(body.as_bytes());
    })
}
