//! MQTT publishing of decoded status reports.
//!
//! The capture path only enqueues; a detached dispatcher owns the MQTT
//! client, so a slow or unreachable broker never delays the relay.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::MqttConfig;
use crate::observability::metrics;
use crate::telemetry::document::TelemetryDocument;

const DEFAULT_MQTT_PORT: u16 = 1883;
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const CLIENT_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid MQTT broker '{0}'")]
    InvalidBroker(String),

    #[error("failed to encode telemetry document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),
}

/// Handle used by the capture path to hand documents to the dispatcher.
///
/// Cloning is cheap. A disabled publisher drops every document.
#[derive(Debug, Clone, Default)]
pub struct Publisher {
    tx: Option<mpsc::UnboundedSender<TelemetryDocument>>,
}

impl Publisher {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Deliver documents to an arbitrary receiver instead of a broker.
    pub fn from_channel(tx: mpsc::UnboundedSender<TelemetryDocument>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Start the MQTT client and dispatcher for `config`.
    ///
    /// Returns a disabled publisher when no broker is configured. Must be
    /// called from within a Tokio runtime.
    pub fn connect(config: &MqttConfig) -> Result<Self, PublishError> {
        let Some(broker) = config.broker.as_deref() else {
            tracing::info!("No MQTT broker configured, publishing disabled");
            return Ok(Self::disabled());
        };

        let (host, port) = broker_address(broker)?;
        let mut options = MqttOptions::new(config.client_id.clone(), host.clone(), port);
        options.set_keep_alive(KEEP_ALIVE);
        if let Some(username) = &config.username {
            options.set_credentials(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            );
        }

        let (client, eventloop) = AsyncClient::new(options, CLIENT_CAPACITY);
        tokio::spawn(drive_connection(eventloop));

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(
            rx,
            client,
            config.topic.clone(),
            qos_level(config.qos),
            config.retained,
        ));

        tracing::info!(
            host = %host,
            port,
            topic = %config.topic,
            qos = config.qos,
            "MQTT publishing enabled"
        );
        Ok(Self { tx: Some(tx) })
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Enqueue a document. Never blocks.
    pub fn publish(&self, document: TelemetryDocument) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(document).is_err() {
            tracing::warn!("Telemetry dispatcher has stopped, document dropped");
            metrics::record_publish("dropped");
        }
    }
}

/// Map a configured QoS number onto the MQTT level. Values above 2 clamp.
pub fn qos_level(qos: u8) -> QoS {
    match qos {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

/// Host and port of a broker URL such as `tcp://broker:1883`.
pub fn broker_address(broker: &str) -> Result<(String, u16), PublishError> {
    let url = url::Url::parse(broker).map_err(|_| PublishError::InvalidBroker(broker.to_string()))?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| PublishError::InvalidBroker(broker.to_string()))?;
    Ok((host.to_string(), url.port().unwrap_or(DEFAULT_MQTT_PORT)))
}

// rumqttc reconnects on the next poll after an error.
async fn drive_connection(mut eventloop: EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                tracing::info!(code = ?ack.code, "Connected to MQTT broker");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "MQTT connection error");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

async fn dispatch(
    mut rx: mpsc::UnboundedReceiver<TelemetryDocument>,
    client: AsyncClient,
    topic: String,
    qos: QoS,
    retain: bool,
) {
    while let Some(document) = rx.recv().await {
        match publish_one(&client, &topic, qos, retain, &document).await {
            Ok(()) => {
                tracing::debug!(topic = %topic, "Published telemetry document");
                metrics::record_publish("ok");
            }
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Failed to publish telemetry document");
                metrics::record_publish("error");
            }
        }
    }
    tracing::debug!("Telemetry dispatcher stopped");
}

async fn publish_one(
    client: &AsyncClient,
    topic: &str,
    qos: QoS,
    retain: bool,
    document: &TelemetryDocument,
) -> Result<(), PublishError> {
    let payload = serde_json::to_vec(document)?;
    client.publish(topic, qos, retain, payload).await?;
    Ok(())
}
