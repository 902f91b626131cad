//! Docker relay backend.
//!
//! Reaches a port inside a container by spawning a per-connection relay
//! subprocess:
//!
//! ```text
//! docker exec -i <container> bash -c "su - root -c 'socat - TCP:localhost:<port>'"
//! ```
//!
//! The subprocess's stdin/stdout pipes form the duplex channel. socat exits
//! on its own once its stdin reaches EOF and the container-side connection
//! closes, so the child is not retained: tokio reaps it in the background.
//!
//! Capability probing (`which socat` inside the container) is separate from
//! opening, because socat can disappear mid-run (e.g. the container was
//! recreated) and each session must fail closed on its own.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{BackendChannel, BackendError, BackendOpener, BackendResult, RelayProber};

/// Backend that relays through `docker exec` + `socat`.
#[derive(Debug, Default)]
pub struct DockerRelay;

impl DockerRelay {
    /// Create a new Docker relay backend.
    pub fn new() -> Self {
        Self
    }

    /// Check that the container exists and is accessible.
    pub async fn container_exists(&self, target: &str) -> bool {
        run_silenced(Command::new("docker").args(["inspect", target])).await
    }
}

/// Run a command with all output discarded; true iff it exited successfully.
async fn run_silenced(command: &mut Command) -> bool {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

#[async_trait]
impl RelayProber for DockerRelay {
    async fn probe(&self, target: &str) -> bool {
        run_silenced(Command::new("docker").args(["exec", target, "which", "socat"])).await
    }
}

#[async_trait]
impl BackendOpener for DockerRelay {
    async fn open(&self, target: &str, port: u16) -> BackendResult<BackendChannel> {
        let relay_cmd = format!("su - root -c 'socat - TCP:localhost:{}'", port);

        let mut child = Command::new("docker")
            .args(["exec", "-i", target, "bash", "-c", &relay_cmd])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BackendError::SpawnFailed { port, source: e })?;

        let stdin = child
            .stdin
            .take()
            .ok_or(BackendError::MissingPipes { port })?;
        let stdout = child
            .stdout
            .take()
            .ok_or(BackendError::MissingPipes { port })?;

        debug!(
            "Spawned socat relay into {} port {} (pid {:?})",
            target,
            port,
            child.id()
        );

        // Dropping the writer half later closes the stdin pipe; socat sees
        // EOF, finishes the container-side stream, and exits.
        Ok(BackendChannel::new(stdout, stdin))
    }
}
