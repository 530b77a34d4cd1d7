//! Request identification and buffering.
//!
//! # Responsibilities
//! - Name the request id header shared by the layers and the `Context`
//! - Buffer the request body up to the configured limit
//! - Build the dispatch `Context` from the incoming request
//!
//! # Design Decisions
//! - Request ID added as early as possible (outermost layer) for tracing
//! - A body that cannot be buffered still reaches the router; the failure
//!   is surfaced through `Context::request_body`

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderName, Request};

use crate::dispatch::Context;
use crate::error::Error;

/// Header carrying the request id, set by the request-id layer when absent.
pub const X_REQUEST_ID: &str = "x-request-id";

pub fn request_id_header() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// Buffer `request` and wrap it in a fresh dispatch context.
pub async fn into_context(request: Request<Body>, max_body_size: usize) -> Context {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, max_body_size)
        .await
        .map_err(|e| Error::BodyRead(e.to_string()));

    if let Err(e) = &body {
        tracing::warn!(path = %parts.uri.path(), error = %e, "Request body not buffered");
    }

    Context::from_parts(parts, body).with_remote_addr(remote_addr)
}
