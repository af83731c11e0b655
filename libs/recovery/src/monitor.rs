//! Cluster-state observation seam.
//!
//! The recovery engine does not watch the cluster itself; task status
//! updates and reconciliation land in an external component which answers
//! the two questions asked here: which pod instances are currently failed,
//! and is this specific instance still failed right now.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use caravel_plan::PodInstance;
use serde::{Deserialize, Serialize};

/// Why a pod instance is considered failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// A task in the pod exited with a failure.
    TaskFailed,

    /// A task was lost (no status updates, unknown to the cluster).
    TaskLost,

    /// The node hosting the pod is unreachable.
    NodeUnreachable,

    /// The instance was explicitly destroyed.
    Destroyed,

    /// The instance's reserved resources are no longer valid.
    ReservationInvalid,
}

/// A failed pod instance as observed by cluster state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPod {
    /// Identity of the failed instance.
    pub pod: PodInstance,

    /// Names of the tasks that need relaunching.
    pub failed_tasks: Vec<String>,

    /// Last-known failure reason.
    pub reason: FailureReason,
}

/// Queryable view of currently-failed pod instances.
///
/// Refreshed at least once per planning cycle by its implementor.
#[async_trait]
pub trait FailureMonitor: Send + Sync {
    /// Snapshot of all currently-failed pod instances.
    async fn failed_pods(&self) -> anyhow::Result<Vec<FailedPod>>;

    /// Whether this specific instance is failed right now.
    ///
    /// Used to re-check at step construction time, closing the race where
    /// an instance heals between observation and construction.
    async fn is_failed(&self, pod: &PodInstance) -> anyhow::Result<bool>;
}

/// In-memory failure monitor for tests and local wiring.
#[derive(Debug, Default)]
pub struct MockFailureMonitor {
    failed: Mutex<HashMap<PodInstance, FailedPod>>,
}

impl MockFailureMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a pod instance as failed.
    pub fn set_failed(&self, pod: PodInstance, failed_tasks: Vec<String>, reason: FailureReason) {
        let entry = FailedPod {
            pod: pod.clone(),
            failed_tasks,
            reason,
        };
        self.lock().insert(pod, entry);
    }

    /// Mark a pod instance as healthy again.
    pub fn set_healthy(&self, pod: &PodInstance) {
        self.lock().remove(pod);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PodInstance, FailedPod>> {
        self.failed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl FailureMonitor for MockFailureMonitor {
    async fn failed_pods(&self) -> anyhow::Result<Vec<FailedPod>> {
        let mut pods: Vec<_> = self.lock().values().cloned().collect();
        pods.sort_by(|a, b| a.pod.cmp(&b.pod));
        Ok(pods)
    }

    async fn is_failed(&self, pod: &PodInstance) -> anyhow::Result<bool> {
        Ok(self.lock().contains_key(pod))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_monitor_tracks_failures() {
        let monitor = MockFailureMonitor::new();
        let pod = PodInstance::new("broker", 1);

        assert!(!monitor.is_failed(&pod).await.unwrap());

        monitor.set_failed(pod.clone(), vec!["server".into()], FailureReason::TaskFailed);
        assert!(monitor.is_failed(&pod).await.unwrap());
        assert_eq!(monitor.failed_pods().await.unwrap().len(), 1);

        monitor.set_healthy(&pod);
        assert!(!monitor.is_failed(&pod).await.unwrap());
        assert!(monitor.failed_pods().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_is_sorted_by_pod() {
        let monitor = MockFailureMonitor::new();
        monitor.set_failed(
            PodInstance::new("broker", 2),
            vec!["server".into()],
            FailureReason::TaskLost,
        );
        monitor.set_failed(
            PodInstance::new("broker", 0),
            vec!["server".into()],
            FailureReason::TaskLost,
        );

        let pods = monitor.failed_pods().await.unwrap();
        assert_eq!(pods[0].pod.index(), 0);
        assert_eq!(pods[1].pod.index(), 2);
    }
}
