//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, status codes, addresses)
//! - Check every route's method and pattern before a router is built
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::StatusCode;
use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::routing::pattern::{self, Segment};
use crate::routing::RouteMethod;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("route {index}: {reason}")]
    InvalidRoute { index: usize, reason: String },

    #[error("route {index}: {method} {path} is declared twice")]
    DuplicateRoute {
        index: usize,
        method: String,
        path: String,
    },
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "metrics",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::ZeroValue("limits.max_body_size"));
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        let invalid = |reason: String| ValidationError::InvalidRoute { index, reason };

        let method = match route.method.parse::<RouteMethod>() {
            Ok(method) => method,
            Err(e) => {
                errors.push(invalid(e.to_string()));
                continue;
            }
        };
        if !route.path.starts_with('/') {
            errors.push(invalid(format!("path {:?} must start with '/'", route.path)));
            continue;
        }
        let segments = match pattern::parse(&route.path) {
            Ok(segments) => segments,
            Err(e) => {
                errors.push(invalid(e.to_string()));
                continue;
            }
        };
        if StatusCode::from_u16(route.status).is_err() {
            errors.push(invalid(format!("status {} is not a valid HTTP status", route.status)));
        }
        if !seen.insert((method.to_string(), tree_key(&segments))) {
            errors.push(ValidationError::DuplicateRoute {
                index,
                method: method.to_string(),
                path: route.path.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// What the route tree compares: literal text and matcher sources. Capture
/// names are ignored, so `/users/:id` and `/users/:uid` share a key.
fn tree_key(segments: &[Segment]) -> Vec<(bool, String)> {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(text) => (true, text.clone()),
            Segment::Dynamic { matcher, .. } => (false, matcher.source().to_string()),
        })
        .collect()
}
