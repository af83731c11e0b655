//! Recovery background worker.
//!
//! Runs the plan-synchronization cycle on a periodic interval until
//! shutdown is signaled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use crate::plan_manager::RecoveryPlanManager;

/// Worker driving the recovery plan manager.
pub struct RecoveryWorker {
    manager: Arc<RecoveryPlanManager>,
    interval: Duration,
}

impl RecoveryWorker {
    /// Create a new recovery worker.
    pub fn new(manager: Arc<RecoveryPlanManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    /// Run the synchronization loop until shutdown is signaled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting recovery worker"
        );

        let mut interval = tokio::time::interval(self.interval);
        // Don't immediately tick on startup - wait for first interval
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.manager.sync().await {
                        Ok(stats) => {
                            if stats.changed() || stats.steps_failed > 0 {
                                info!(
                                    steps_created = stats.steps_created,
                                    steps_removed = stats.steps_removed,
                                    steps_failed = stats.steps_failed,
                                    "Recovery sync complete"
                                );
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "Recovery sync failed");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Recovery worker shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use caravel_plan::PodInstance;

    use super::*;
    use crate::constrain::Unconstrained;
    use crate::monitor::{FailureReason, MockFailureMonitor};
    use crate::policy::ReasonPolicy;

    #[tokio::test(start_paused = true)]
    async fn test_worker_syncs_and_shuts_down() {
        let monitor = Arc::new(MockFailureMonitor::new());
        monitor.set_failed(
            PodInstance::new("broker", 0),
            vec!["server".into()],
            FailureReason::TaskFailed,
        );
        let manager = Arc::new(RecoveryPlanManager::new(
            monitor,
            Arc::new(ReasonPolicy),
            Arc::new(Unconstrained::new()),
        ));

        let worker = RecoveryWorker::new(manager.clone(), Duration::from_secs(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

        // Let two ticks elapse under the paused clock.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(manager.step_count().await, 1);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
