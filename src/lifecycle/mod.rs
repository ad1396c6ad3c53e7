//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Snapshot → Publisher → Metrics exporter → Listener → Server
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight relays → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Shutdown has a deadline: exit after `timeouts.shutdown_secs`

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
