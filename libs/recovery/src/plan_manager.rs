//! Recovery plan synchronization.
//!
//! The plan manager keeps the set of active recovery steps in sync with
//! the set of pod instances currently understood to be failed:
//! - one step per failing instance, created when the failure is first
//!   observed and left untouched while the instance stays failed;
//! - structural removal once the instance is healthy again or the step
//!   completed, never an artificial completion.
//!
//! The step collection is guarded by a single `RwLock`: the planning cycle
//! is the one writer, status surfaces read concurrently.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use caravel_plan::{OfferRecommendation, PodInstance, PodInstanceRequirement, Status, Step, StepId};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::constrain::LaunchConstrainer;
use crate::error::RecoveryError;
use crate::monitor::FailureMonitor;
use crate::policy::RecoveryPolicy;
use crate::recovery_type::RecoveryType;
use crate::step::RecoveryStep;

/// Statistics from one synchronization cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    /// Steps created for newly-observed failures.
    pub steps_created: u32,

    /// Steps removed because the instance healed or the step completed.
    pub steps_removed: u32,

    /// Failures for which step construction failed.
    pub steps_failed: u32,
}

impl SyncStats {
    /// True if the cycle changed the plan.
    pub fn changed(&self) -> bool {
        self.steps_created > 0 || self.steps_removed > 0
    }
}

/// Read-only view of one step, for status surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSnapshot {
    pub id: StepId,
    pub name: String,
    pub pod: PodInstance,
    pub status: Status,
    pub recovery_type: RecoveryType,
    pub message: String,
}

/// Keeps recovery steps synchronized with observed failures.
pub struct RecoveryPlanManager {
    steps: RwLock<HashMap<PodInstance, RecoveryStep>>,
    monitor: Arc<dyn FailureMonitor>,
    policy: Arc<dyn RecoveryPolicy>,
    constrainer: Arc<dyn LaunchConstrainer>,
}

impl RecoveryPlanManager {
    /// Create a plan manager.
    ///
    /// The constrainer handle is shared by every step the manager creates;
    /// it is the process-wide throttle window for the recovery subsystem.
    pub fn new(
        monitor: Arc<dyn FailureMonitor>,
        policy: Arc<dyn RecoveryPolicy>,
        constrainer: Arc<dyn LaunchConstrainer>,
    ) -> Self {
        Self {
            steps: RwLock::new(HashMap::new()),
            monitor,
            policy,
            constrainer,
        }
    }

    /// Run one synchronization cycle.
    ///
    /// Idempotent: re-running with unchanged failure state leaves the plan
    /// untouched. A per-pod construction error is absorbed into the stats
    /// without aborting the cycle for other pods; a monitor error aborts
    /// the cycle (there is no trustworthy failure snapshot to act on).
    pub async fn sync(&self) -> Result<SyncStats, RecoveryError> {
        let mut stats = SyncStats::default();

        let failures = self
            .monitor
            .failed_pods()
            .await
            .map_err(RecoveryError::Monitor)?;
        let failed_set: HashSet<&PodInstance> = failures.iter().map(|f| &f.pod).collect();
        debug!(failed_count = failures.len(), "Observed failure snapshot");

        // Holding the write lock across the whole edit keeps the cycle
        // atomic with respect to concurrent step completion.
        let mut steps = self.steps.write().await;

        steps.retain(|pod, step| {
            let keep = failed_set.contains(pod) && !step.status().is_complete();
            if !keep {
                info!(
                    pod = %pod,
                    step_id = %step.id(),
                    status = %step.status(),
                    "Removing recovery step"
                );
                stats.steps_removed += 1;
            }
            keep
        });

        for failure in failures {
            if steps.contains_key(&failure.pod) {
                continue;
            }

            // The instance may have healed between observation and now;
            // re-check before constructing a step.
            let still_failed = self
                .monitor
                .is_failed(&failure.pod)
                .await
                .map_err(RecoveryError::Monitor)?;
            if !still_failed {
                debug!(pod = %failure.pod, "Instance healed before step construction, skipping");
                continue;
            }

            let recovery_type = self.policy.classify(&failure);
            let name = format!("recover-{}", failure.pod.name());
            match RecoveryStep::new(
                name,
                Status::Pending,
                failure.pod.clone(),
                failure.failed_tasks.clone(),
                recovery_type,
                self.constrainer.clone(),
            ) {
                Ok(step) => {
                    info!(
                        pod = %failure.pod,
                        step_id = %step.id(),
                        recovery_type = %recovery_type,
                        reason = ?failure.reason,
                        "Created recovery step"
                    );
                    steps.insert(failure.pod, step);
                    stats.steps_created += 1;
                }
                Err(e) => {
                    warn!(
                        pod = %failure.pod,
                        error = %e,
                        "Failed to construct recovery step"
                    );
                    stats.steps_failed += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Offer every eligible, admitted step for resource matching.
    ///
    /// Drives [`Step::start`] on pending steps; steps the constrainer
    /// defers stay pending and simply produce nothing this cycle.
    pub async fn offer_candidates(&self) -> Vec<(StepId, PodInstanceRequirement)> {
        let mut steps = self.steps.write().await;
        steps
            .values_mut()
            .filter_map(|step| step.start().map(|req| (step.id(), req)))
            .collect()
    }

    /// Deliver the matcher's recommendations for a step's requirement.
    pub async fn update_offer_status(
        &self,
        step_id: StepId,
        recommendations: &[OfferRecommendation],
    ) -> Result<(), RecoveryError> {
        let mut steps = self.steps.write().await;
        let step = steps
            .values_mut()
            .find(|step| step.id() == step_id)
            .ok_or(RecoveryError::UnknownStep(step_id))?;
        step.update_offer_status(recommendations);
        Ok(())
    }

    /// Apply external status feedback (task running, task failed) to a step.
    pub async fn record_status(&self, step_id: StepId, status: Status) -> Result<(), RecoveryError> {
        let mut steps = self.steps.write().await;
        let step = steps
            .values_mut()
            .find(|step| step.id() == step_id)
            .ok_or(RecoveryError::UnknownStep(step_id))?;
        step.set_status(status)?;
        Ok(())
    }

    /// Snapshot of all steps, sorted by pod, for status surfaces.
    pub async fn steps(&self) -> Vec<StepSnapshot> {
        let steps = self.steps.read().await;
        let mut snapshots: Vec<_> = steps
            .values()
            .map(|step| StepSnapshot {
                id: step.id(),
                name: step.name().to_string(),
                pod: step.pod_instance().clone(),
                status: step.status(),
                recovery_type: step.recovery_type(),
                message: step.message(),
            })
            .collect();
        snapshots.sort_by(|a, b| a.pod.cmp(&b.pod));
        snapshots
    }

    /// Number of active recovery steps.
    pub async fn step_count(&self) -> usize {
        self.steps.read().await.len()
    }
}
