//! HVAC capture proxy library.
//!
//! Sits between a thermostat and its vendor cloud, relays every exchange,
//! stores both bodies on disk and turns the periodic status report into
//! Prometheus text and MQTT messages.

pub mod capture;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod telemetry;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
