//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::capture::filename::Charset;

/// Root configuration for the HVAC capture proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Where captured artifacts are written.
    pub storage: StorageConfig,

    /// Capture pipeline behaviour.
    pub capture: CaptureConfig,

    /// Upstream the device traffic is relayed to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Optional MQTT publishing of telemetry documents.
    pub mqtt: MqttConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Storage directory for captured bodies and the metrics snapshot.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding all artifacts. Created on demand.
    pub data_dir: String,

    /// Characters replaced when deriving artifact names.
    pub filename_charset: Charset,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "/data".to_string(),
            filename_charset: Charset::Exhaustive,
        }
    }
}

/// Capture pipeline settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Strip `<update>` elements from captured and relayed bodies.
    pub block_updates: bool,

    /// Request paths ending with this suffix carry the status document.
    pub telemetry_path_suffix: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            block_updates: false,
            telemetry_path_suffix: "/status".to_string(),
        }
    }
}

/// Upstream settings.
///
/// With no authority configured the proxy is transparent: it forwards over
/// plain HTTP to the host named in the request's `Host` header.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Fixed upstream authority (e.g., "127.0.0.1:3000").
    pub authority: Option<String>,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Drain deadline after a shutdown signal, in seconds.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_secs: 10,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum buffered body size in bytes, applied to both directions.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// MQTT publish sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker URL (e.g., "tcp://broker:1883"). Publishing is off when unset.
    pub broker: Option<String>,

    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Topic the status documents are published to.
    pub topic: String,

    /// Delivery guarantee, 0..=2.
    pub qos: u8,

    /// Ask the broker to retain the last document.
    pub retained: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: None,
            client_id: "hvac-proxy".to_string(),
            username: None,
            password: None,
            topic: "hvac/".to_string(),
            qos: 0,
            retained: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the self-instrumentation Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Bind address for the self-instrumentation endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.storage.data_dir, "/data");
        assert_eq!(config.storage.filename_charset, Charset::Exhaustive);
        assert!(!config.capture.block_updates);
        assert_eq!(config.capture.telemetry_path_suffix, "/status");
        assert!(config.mqtt.broker.is_none());
        assert_eq!(config.mqtt.topic, "hvac/");
    }

    #[test]
    fn test_partial_toml() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [storage]
            data_dir = "/tmp/hvac"
            filename_charset = "reserved"

            [capture]
            block_updates = true
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.data_dir, "/tmp/hvac");
        assert_eq!(config.storage.filename_charset, Charset::Reserved);
        assert!(config.capture.block_updates);
        // Untouched sections keep their defaults
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.security.max_body_size, 2 * 1024 * 1024);
    }
}
