//! Periodic eviction of idle sessions.

use super::registry::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Handle to the background reaper task.
pub struct Reaper {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Reaper {
    /// Spawn a task that calls [`SessionRegistry::reap`] every `period`.
    pub fn spawn(registry: Arc<SessionRegistry>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = registry.reap().await;
                        if !removed.is_empty() {
                            let remaining = registry.count().await;
                            info!(count = removed.len(), remaining, "reaped idle sessions");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("reaper stopped");
        });
        debug!(period_secs = period.as_secs(), "reaper started");
        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop the task and wait for it to finish its current cycle.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "reaper task ended abnormally");
        }
    }
}
