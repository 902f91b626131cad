//! dockward: forward host TCP ports into a Docker container.
//!
//! This is the main entry point for the dockward binary. It parses CLI
//! arguments, initializes logging, and hands off to the orchestrator, which
//! probes the target container and runs the listeners until shutdown.

use anyhow::{Context, Result};
use clap::Parser;
use dockward::{cli::Cli, orchestrator};
use tracing::debug;

fn main() -> Result<()> {
    // Parse CLI arguments first (before any other initialization)
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;

    debug!("Parsed CLI arguments: {:?}", cli);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(orchestrator::run(&cli))
}

/// Initialize the tracing subscriber.
///
/// Logs go to stderr so anything piped through forwarded connections on
/// stdout is unaffected.
///
/// # Verbosity Levels
/// - 0 (default): Info level (or whatever `RUST_LOG` says)
/// - 1 (-v): Debug level
/// - 2+ (-vv): Trace level
fn init_tracing(verbose: u8) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
