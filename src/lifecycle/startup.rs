//! Startup orchestration.
//!
//! Subsystems start in dependency order and the listener binds last, so the
//! device only reaches the proxy once capture and publishing are ready.

use std::io;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinError;

use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::observability::metrics::init_metrics;
use crate::telemetry::{MetricsSnapshot, PublishError, Publisher};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid metrics address: {0}")]
    MetricsAddress(#[from] AddrParseError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("server error: {0}")]
    Server(#[source] io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] JoinError),
}

/// Run the proxy until a shutdown signal arrives and in-flight requests drain.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        data_dir = %config.storage.data_dir,
        upstream = config.upstream.authority.as_deref().unwrap_or("transparent"),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let snapshot = Arc::new(MetricsSnapshot::new(&config.storage.data_dir));
    let publisher = Publisher::connect(&config.mqtt)?;

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    let drain_deadline = Duration::from_secs(config.timeouts.shutdown_secs);
    let server = HttpServer::new(config, snapshot, publisher);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.wait()));

    tokio::select! {
        signal = wait_for_signal() => {
            tracing::info!(signal, "Shutdown signal received");
        }
        result = &mut server_task => {
            return server_result(result);
        }
    }

    shutdown.trigger();
    match tokio::time::timeout(drain_deadline, server_task).await {
        Ok(result) => server_result(result),
        Err(_) => {
            tracing::warn!(
                deadline_secs = drain_deadline.as_secs(),
                "Drain deadline exceeded, abandoning in-flight requests"
            );
            Ok(())
        }
    }
}

fn server_result(result: Result<io::Result<()>, JoinError>) -> Result<(), StartupError> {
    result?.map_err(StartupError::Server)
}
