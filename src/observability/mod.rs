//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router and middleware produce:
//!     → logging.rs (subscriber for structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through the access log and response headers
//! - Metric calls are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
