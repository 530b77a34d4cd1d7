//! Handler type and the router's default handlers.

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use crate::dispatch::Context;

/// Body written by [`default_not_found`].
pub const NOT_FOUND_BODY: &str = r#"{"code":"404","message":"Not Found."}"#;

/// A request-processing unit. Cheap to clone; the closure is shared.
#[derive(Clone)]
pub struct Handler {
    name: &'static str,
    func: Arc<dyn Fn(&mut Context) + Send + Sync>,
}

impl Handler {
    /// Wrap a closure; the handler is named after the closure's type.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        Self {
            name: std::any::type_name::<F>(),
            func: Arc::new(func),
        }
    }

    /// Wrap a closure under an explicit name.
    pub fn named<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        Self {
            name,
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, ctx: &mut Context) {
        (self.func)(ctx)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Shorthand for [`Handler::new`].
pub fn handler_fn<F>(func: F) -> Handler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Handler::new(func)
}

/// Writes a 404 with a fixed JSON body.
pub fn default_not_found(ctx: &mut Context) {
    ctx.write_header(StatusCode::NOT_FOUND);
    ctx.set_header("content-type", "application/json");
    ctx.write(NOT_FOUND_BODY.as_bytes());
}

/// Writes a 500 JSON body when nothing has been written yet; otherwise only
/// the status is finalized, which is a no-op once the body has started.
pub fn default_panic_handler(ctx: &mut Context) {
    if ctx.response_body_size() == 0 {
        ctx.json_with_code(
            &json!({"code": "server-err", "message": "Fatal Server Error."}),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
    } else {
        ctx.write_header(StatusCode::INTERNAL_SERVER_ERROR);
    }
}
