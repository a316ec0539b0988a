//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gates produce:
//!     → logging.rs (structured events on trip and reset)
//!     → metrics.rs (check outcomes, trips, resets, tracked keys)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Nothing is recorded while a gate lock is held
//! - Metrics are no-ops until the exporter is installed

pub mod logging;
pub mod metrics;
