//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → loader.rs (optional TOML file, then environment overrides)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → cloned into the subsystems that need it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - The environment keeps the variable names the device images already set

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, ConfigError, InvalidEnv};
pub use schema::{
    CaptureConfig, ListenerConfig, MqttConfig, ObservabilityConfig, ProxyConfig, StorageConfig,
    UpstreamConfig,
};
