//! Process-wide shutdown signaling.
//!
//! A single fire-once notification shared by every long-running task. It is
//! fired by SIGINT/SIGTERM, or by a listener hitting a fatal error, and
//! observed by the orchestrator's top-level wait. Firing is idempotent:
//! after the first fire, further fires are no-ops.

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Fire-once process-wide shutdown notification.
///
/// Cloning yields another handle to the same underlying signal.
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    /// Create a new, armed (not yet fired) signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Fire the signal. No-op if already fired.
    pub fn fire(&self) {
        let was_fired = self.tx.send_replace(true);
        if !was_fired {
            debug!("Shutdown signal fired");
        }
    }

    /// Whether the signal has fired.
    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribe to the signal for use in `select!` loops.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Wait until the signal fires. Returns immediately if it already has.
    pub async fn fired(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives at least as long as `self`, so wait_for cannot
        // fail with a closed channel here.
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate SIGINT and SIGTERM into the shutdown signal.
///
/// Runs until the first of either signal arrives, fires `shutdown`, and
/// returns. Registration failures are logged and leave the process without
/// signal-driven shutdown (listener fatal errors can still fire it).
pub async fn run_signal_listener(shutdown: ShutdownSignal) {
    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to register SIGINT handler: {}", e);
            return;
        }
    };
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to register SIGTERM handler: {}", e);
            return;
        }
    };

    tokio::select! {
        _ = interrupt.recv() => {
            info!("Received interrupt signal, shutting down...");
        }
        _ = terminate.recv() => {
            info!("Received termination signal, shutting down...");
        }
    }

    shutdown.fire();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_fire_is_idempotent() {
        let shutdown = ShutdownSignal::new();
        assert!(!shutdown.is_fired());

        shutdown.fire();
        assert!(shutdown.is_fired());

        // Second fire is a no-op, not an error
        shutdown.fire();
        assert!(shutdown.is_fired());
    }

    #[tokio::test]
    async fn test_fired_observes_earlier_fire() {
        let shutdown = ShutdownSignal::new();
        shutdown.fire();

        // Must not hang even though the fire happened before the wait
        timeout(Duration::from_secs(1), shutdown.fired())
            .await
            .expect("fired() should return immediately after fire()");
    }

    #[tokio::test]
    async fn test_clone_shares_signal() {
        let shutdown = ShutdownSignal::new();
        let observer = shutdown.clone();

        let waiter = tokio::spawn(async move { observer.fired().await });

        shutdown.fire();
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cloned handle should observe the fire")
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscribe_sees_fire() {
        let shutdown = ShutdownSignal::new();
        let mut rx = shutdown.subscribe();
        assert!(!*rx.borrow());

        shutdown.fire();
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }
}
