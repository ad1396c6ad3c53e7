//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters and histograms about the proxy itself)
//!
//! Consumers:
//!     → stdout
//!     → optional Prometheus scrape endpoint on its own address
//! ```
//!
//! The self-instrumentation here is separate from the device telemetry
//! served on `/metrics` by the proxy listener.

pub mod logging;
pub mod metrics;
