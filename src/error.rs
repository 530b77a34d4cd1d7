//! Crate-wide error type.
//!
//! Registration errors (`RouteConflict`, `InvalidPattern`,
//! `InvalidMethod`, `EmptyHandlerChain`) are fatal to startup and propagate with `?`.
//! The remaining variants only ever live inside a request's
//! [`Context`](crate::dispatch::Context) error slot.

use thiserror::Error;

/// Errors produced while building or running the router.
#[derive(Debug, Error)]
pub enum Error {
    /// The full path already carries a route in the same tree.
    #[error("route conflict: {0} is already registered")]
    RouteConflict(String),

    /// The route pattern could not be parsed or compiled.
    #[error("invalid route pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The method name is not a valid HTTP method token.
    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),

    /// A route was registered without any handler.
    #[error("route {0} has no handlers")]
    EmptyHandlerChain(String),

    /// Reading the request body failed.
    #[error("failed to read body: {0}")]
    BodyRead(String),

    /// A handler panicked during dispatch.
    #[error("handler panicked: {0}")]
    HandlerPanic(String),

    /// A response body could not be serialized.
    #[error("failed to encode response: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
