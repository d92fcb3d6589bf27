//! Kubernetes operator for Drone CI.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use drone_operator::config::OperatorConfig;
use drone_operator::{controllers, metrics, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = OperatorConfig::parse();
    telemetry::init(&config.log_level, config.log_format);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Drone operator");

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let metrics_addr = config.metrics_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = metrics::serve(metrics_addr).await {
            error!("Metrics server failed: {e}");
        }
    });

    controllers::drone_server_controller::run(client, &config).await;

    Ok(())
}
