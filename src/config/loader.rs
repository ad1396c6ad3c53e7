//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

/// An environment variable whose value could not be applied.
///
/// Returned rather than logged, since loading happens before the
/// subscriber is installed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Ignoring invalid {key}: '{value}'")]
pub struct InvalidEnv {
    pub key: &'static str,
    pub value: String,
}

impl InvalidEnv {
    fn new(key: &'static str, value: String) -> Self {
        Self { key, value }
    }
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the runtime configuration.
///
/// Starts from defaults (or the TOML file when given), layers the process
/// environment on top, then validates the result. Ignored environment
/// values are handed back for the caller to report once logging is up.
pub fn load(path: Option<&Path>) -> Result<(ProxyConfig, Vec<InvalidEnv>), ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => ProxyConfig::default(),
    };
    let ignored = apply_env(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok((config, ignored))
}

fn parse_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts `std::env::var` so tests do not touch process state.
/// Unparseable numeric or boolean values leave the setting unchanged and are
/// returned.
pub fn apply_env<F>(config: &mut ProxyConfig, lookup: F) -> Vec<InvalidEnv>
where
    F: Fn(&str) -> Option<String>,
{
    let mut ignored = Vec::new();
    if let Some(port) = lookup("PORT") {
        match port.parse::<u16>() {
            Ok(port) => {
                let host = config
                    .listener
                    .bind_address
                    .rsplit_once(':')
                    .map(|(host, _)| host.to_string())
                    .unwrap_or_else(|| "0.0.0.0".to_string());
                config.listener.bind_address = format!("{}:{}", host, port);
            }
            Err(_) => ignored.push(InvalidEnv::new("PORT", port)),
        }
    }
    if let Some(dir) = lookup("DATA_DIR").filter(|d| !d.is_empty()) {
        config.storage.data_dir = dir;
    }
    if let Some(flag) = lookup("BLOCK_UPDATES") {
        // Only the literal "true" enables redaction.
        config.capture.block_updates = flag == "true";
    }
    if let Some(broker) = lookup("MQTT_BROKER") {
        config.mqtt.broker = if broker.is_empty() { None } else { Some(broker) };
    }
    if let Some(user) = lookup("MQTT_USER").filter(|u| !u.is_empty()) {
        config.mqtt.username = Some(user);
        config.mqtt.password = lookup("MQTT_PASSWORD");
    }
    if let Some(topic) = lookup("MQTT_TOPIC").filter(|t| !t.is_empty()) {
        config.mqtt.topic = topic;
    }
    if let Some(qos) = lookup("MQTT_QOS").filter(|q| !q.is_empty()) {
        match qos.parse::<u8>() {
            Ok(qos) => config.mqtt.qos = qos,
            Err(_) => ignored.push(InvalidEnv::new("MQTT_QOS", qos)),
        }
    }
    if let Some(retained) = lookup("MQTT_RETAINED").filter(|r| !r.is_empty()) {
        match parse_bool(&retained) {
            Some(retained) => config.mqtt.retained = retained,
            None => ignored.push(InvalidEnv::new("MQTT_RETAINED", retained)),
        }
    }
    ignored
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
