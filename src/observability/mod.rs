//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! net / proxy produce:
//!     → logging.rs (structured tracing events, per-connection spans)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout log lines
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every per-connection event carries `connection_id` and `peer_addr`
//! - Metrics recording is a no-op until an exporter is installed

pub mod logging;
pub mod metrics;
