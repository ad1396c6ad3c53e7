//! Telemetry subsystem.
//!
//! # Data Flow
//! ```text
//! captured request body
//!     → extract.rs (recognize and decode the status report)
//!     → exposition.rs (render Prometheus text)
//!     → snapshot.rs (swap in memory, persist metrics_last.txt)
//!     → publish.rs (hand the decoded report to the MQTT dispatcher)
//! ```

pub mod document;
pub mod exposition;
pub mod extract;
pub mod publish;
pub mod snapshot;

pub use document::{IndoorUnit, TelemetryDocument, Zone, Zones};
pub use extract::{extract, ExtractionError};
pub use publish::{PublishError, Publisher};
pub use snapshot::{MetricsSnapshot, SNAPSHOT_FILE};
