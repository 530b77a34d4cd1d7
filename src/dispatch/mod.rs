//! Dispatch pipeline.
//!
//! # Data Flow
//! ```text
//! Router::lookup → (handler chain, captures)
//!     → Context::bind (cursor before first handler)
//!     → ctx.next() → handler 0 → ctx.next() → handler 1 → ...
//!     ← control returns upstream after the downstream chain finishes
//!     → Context::into_response
//! ```
//!
//! # Design Decisions
//! - Advancing is cooperative: a handler that does not call `next()` aborts
//! - Panics are caught at the pipeline boundary and never reach the transport
//! - Handlers are synchronous; request and response are fully buffered

pub mod context;
pub mod handler;

pub use context::{ChainState, Context};
pub use handler::{
    default_not_found, default_panic_handler, handler_fn, Handler, NOT_FOUND_BODY,
};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run `f` against `ctx`, returning the panic message if it panicked.
pub(crate) fn catch_panic(ctx: &mut Context, f: impl FnOnce(&mut Context)) -> Option<String> {
    panic::catch_unwind(AssertUnwindSafe(|| f(&mut *ctx)))
        .err()
        .map(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
