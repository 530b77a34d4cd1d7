//! Route groups: a shared path prefix and shared leading handlers.

use axum::http::Method;

use crate::dispatch::Handler;
use crate::error::Result;
use crate::routing::router::{RouteMethod, Router};

/// Registers routes on a [`Router`] under a common base path. Handlers given
/// to the group run before each route's own handlers.
pub struct Group<'r> {
    router: &'r mut Router,
    base_path: String,
    handlers: Vec<Handler>,
}

impl<'r> Group<'r> {
    pub(crate) fn new(router: &'r mut Router, base_path: &str, handlers: Vec<Handler>) -> Self {
        Self {
            router,
            base_path: base_path.to_string(),
            handlers,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Add handlers for routes registered on this group from now on.
    pub fn use_handlers(&mut self, handlers: impl IntoIterator<Item = Handler>) {
        self.handlers.extend(handlers);
    }

    /// A nested group inheriting this group's prefix and handlers.
    pub fn group(&mut self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> Group<'_> {
        let mut inherited = self.handlers.clone();
        inherited.extend(handlers);
        Group {
            base_path: join_paths(&self.base_path, path),
            router: &mut *self.router,
            handlers: inherited,
        }
    }

    pub fn register(
        &mut self,
        method: impl Into<RouteMethod>,
        path: &str,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> Result<()> {
        let mut chain = self.handlers.clone();
        chain.extend(handlers);
        let full_path = join_paths(&self.base_path, path);
        self.router.register(method, &full_path, chain)
    }

    pub fn get(&mut self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> Result<()> {
        self.register(Method::GET, path, handlers)
    }

    pub fn post(&mut self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> Result<()> {
        self.register(Method::POST, path, handlers)
    }

    pub fn put(&mut self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> Result<()> {
        self.register(Method::PUT, path, handlers)
    }

    pub fn patch(&mut self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> Result<()> {
        self.register(Method::PATCH, path, handlers)
    }

    pub fn delete(&mut self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> Result<()> {
        self.register(Method::DELETE, path, handlers)
    }

    pub fn any(&mut self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> Result<()> {
        self.register(RouteMethod::Any, path, handlers)
    }
}

/// Join a base path and a relative route without doubling the separator.
fn join_paths(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{handler_fn, Context};
    use axum::body::Bytes;
    use axum::http::Request;

    fn run(router: &Router, method: Method, uri: &str) -> Context {
        let mut ctx = Context::new(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Bytes::new())
                .unwrap(),
        );
        router.handle(&mut ctx);
        ctx
    }

    fn tag(label: &'static str) -> Handler {
        handler_fn(move |ctx| {
            ctx.write(label.as_bytes());
            ctx.next();
        })
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/api", "/users"), "/api/users");
        assert_eq!(join_paths("/api/", "/users"), "/api/users");
        assert_eq!(join_paths("/api", "users"), "/api/users");
        assert_eq!(join_paths("/api", ""), "/api");
        assert_eq!(join_paths("", "/users"), "/users");
    }

    #[test]
    fn test_group_prefix_and_handlers() {
        let mut router = Router::new();
        {
            let mut api = router.group("/api", [tag("api;")]);
            api.get("/status", [tag("status")]).unwrap();

            let mut admin = api.group("/admin", [tag("admin;")]);
            admin.delete("/users/:id", [tag("delete")]).unwrap();
        }

        let ctx = run(&router, Method::GET, "/api/status");
        assert_eq!(ctx.response_body(), b"api;status");

        let ctx = run(&router, Method::DELETE, "/api/admin/users/3");
        assert_eq!(ctx.response_body(), b"api;admin;delete");
        assert_eq!(ctx.param_named("id"), Some("3"));

        let ctx = run(&router, Method::GET, "/status");
        assert_eq!(ctx.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_group_conflict_propagates() {
        let mut router = Router::new();
        let mut api = router.group("/api", Vec::new());
        api.get("/ping", [tag("a")]).unwrap();
        assert!(api.get("ping", [tag("b")]).is_err());
    }
}
