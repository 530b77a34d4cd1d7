//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout / request-id / trace layers)
//!     → request.rs (buffer body, build Context)
//!     → routing::Router::handle (lookup, handler chain)
//!     → Context::into_response
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
