//! Prefix-tree HTTP request router.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http::server (axum fallback, layers)
//!                          │
//!                          ▼
//!                      http::request (buffer body → Context)
//!                          │
//!                          ▼
//!                      routing::Router ──▶ routing::tree (per-method prefix tree)
//!                          │
//!                          ▼
//!                      dispatch (global middleware + route chain, next())
//!                          │
//!     Client Response      ▼
//!     ◀─────────────── Context::into_response
//!
//!     Cross-cutting: config (TOML, reload), observability (tracing, metrics),
//!                    lifecycle (signals, shutdown), middleware (access log)
//! ```

// Core subsystems
pub mod dispatch;
pub mod error;
pub mod routing;

// Server
pub mod config;
pub mod http;
pub mod middleware;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ServerConfig;
pub use dispatch::{handler_fn, Context, Handler};
pub use error::{Error, Result};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use middleware::Logger;
pub use routing::{Group, RouteMethod, Router};
