//! Startup sequencing and top-level lifecycle.
//!
//! Validates the configuration, probes the target environment, spawns one
//! listener task per configured port, wires up signal handling, and then
//! blocks on the shutdown signal. Shutdown does not drain: in-flight
//! sessions are dropped when the process exits.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::backend::{BackendOpener, DockerRelay, RelayProber};
use crate::cli::Cli;
use crate::forward::{PortListener, SlotPool};
use crate::shutdown::{self, ShutdownSignal};

/// Run dockward until shutdown.
///
/// Configuration and environment errors are fatal before any listener
/// starts and surface as a nonzero exit.
pub async fn run(cli: &Cli) -> Result<()> {
    let ports = cli.port_list().context("Invalid --ports value")?;

    if cli.container.trim().is_empty() {
        anyhow::bail!("You must specify a container id");
    }
    let container = cli.container.as_str();

    let relay = Arc::new(DockerRelay::new());

    if !relay.container_exists(container).await {
        anyhow::bail!(
            "Container '{}' does not exist or is not accessible",
            container
        );
    }

    if !relay.probe(container).await {
        error!("'socat' is not installed in container {}", container);
        error!("Please install socat in the container with:");
        error!(
            "  docker exec {} apt-get update && docker exec {} apt-get install -y socat",
            container, container
        );
        anyhow::bail!("Cannot proceed without socat installed in the container");
    }

    let shutdown = ShutdownSignal::new();
    tokio::spawn(shutdown::run_signal_listener(shutdown.clone()));

    let slots = SlotPool::default();
    let target: Arc<str> = Arc::from(container);
    let prober: Arc<dyn RelayProber> = relay.clone();
    let opener: Arc<dyn BackendOpener> = relay;

    for port in ports {
        let listener = PortListener::new(
            port,
            Arc::clone(&target),
            slots.clone(),
            Arc::clone(&prober),
            Arc::clone(&opener),
            shutdown.clone(),
        );
        tokio::spawn(listener.run());
    }

    // Listener tasks are not joined: the first fatal listener error or
    // termination signal unblocks this wait and the process exits.
    shutdown.fired().await;
    info!("Shutting down...");

    Ok(())
}
