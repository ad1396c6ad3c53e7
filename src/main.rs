//! HVAC capture proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!                 │                 CAPTURE PROXY                │
//!   Thermostat    │  ┌────────┐   ┌─────────┐   ┌─────────────┐  │
//!   ──────────────┼─▶│  http  │──▶│ capture │──▶│ hyper client│──┼──▶ Vendor cloud
//!                 │  │ server │   │  sink   │   └──────┬──────┘  │
//!   ◀─────────────┼──│        │◀──│         │◀─────────┘         │
//!                 │  └───┬────┘   └────┬────┘                    │
//!                 │      │             │ status reports          │
//!                 │      │             ▼                         │
//!   Prometheus    │      │      ┌────────────┐    ┌──────────┐   │
//!   ◀─────────────┼──────┴──────│ telemetry  │───▶│  MQTT    │───┼──▶ Broker
//!   (/metrics)    │             │  snapshot  │    │publisher │   │
//!                 │             └────────────┘    └──────────┘   │
//!                 └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use hvac_proxy::config;
use hvac_proxy::lifecycle::startup;
use hvac_proxy::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "hvac-proxy", version, about = "Transparent capture proxy for HVAC thermostats")]
struct Cli {
    /// Path to a TOML configuration file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (config, ignored_env) = config::load(cli.config.as_deref())?;

    logging::init(&config.observability.log_level);
    tracing::info!("hvac-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    for invalid in &ignored_env {
        tracing::warn!(key = invalid.key, value = %invalid.value, "{}", invalid);
    }

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
