//! Configuration validation.
//!
//! Serde handles the syntactic side; this module checks values that parse
//! but cannot work at runtime. All errors are collected, not just the first.

use std::net::SocketAddr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("storage.data_dir must not be empty")]
    EmptyDataDir,

    #[error("capture.telemetry_path_suffix must start with '/'")]
    TelemetrySuffix,

    #[error("invalid upstream authority '{0}'")]
    UpstreamAuthority(String),

    #[error("timeouts.request_secs must be greater than zero")]
    RequestTimeout,

    #[error("security.max_body_size must be greater than zero")]
    BodyLimit,

    #[error("mqtt.qos must be 0, 1 or 2, got {0}")]
    Qos(u8),

    #[error("mqtt.broker '{0}' is not a valid URL")]
    Broker(String),
}

/// Check a configuration, returning every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.storage.data_dir.trim().is_empty() {
        errors.push(ValidationError::EmptyDataDir);
    }
    if !config.capture.telemetry_path_suffix.starts_with('/') {
        errors.push(ValidationError::TelemetrySuffix);
    }
    if let Some(authority) = &config.upstream.authority {
        if authority.parse::<Authority>().is_err() {
            errors.push(ValidationError::UpstreamAuthority(authority.clone()));
        }
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::BodyLimit);
    }
    if config.mqtt.qos > 2 {
        errors.push(ValidationError::Qos(config.mqtt.qos));
    }
    if let Some(broker) = &config.mqtt.broker {
        if url::Url::parse(broker).is_err() {
            errors.push(ValidationError::Broker(broker.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
