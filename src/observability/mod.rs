//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Engine and transport produce:
//!     → logging.rs (structured log events, text or JSON)
//!     → metrics.rs (request counter, latency histogram)
//!
//! Consumers:
//!     → stdout log stream
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the tower-http layers into every span
//! - Metrics are cheap (atomic increments) and off unless an exporter is installed

pub mod logging;
pub mod metrics;
