//! Middleware handlers built on the dispatch `Context`.
//!
//! Each middleware is an ordinary [`Handler`](crate::dispatch::Handler)
//! that calls `Context::next` to run the rest of the chain.

pub mod logger;

pub use logger::{default_should_log_body, BodyPolicy, Logger};
