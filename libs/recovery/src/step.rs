//! A single recovery attempt for one failed pod instance.

use std::sync::Arc;

use caravel_plan::{
    DeploymentStep, OfferRecommendation, PodInstance, PodInstanceRequirement, Status, StatusError,
    Step, StepId,
};

use crate::constrain::LaunchConstrainer;
use crate::error::RecoveryError;
use crate::recovery_type::RecoveryType;

/// A step representing "relaunch this failed pod instance".
///
/// Wraps a generic [`DeploymentStep`] and adds two things: a fixed
/// [`RecoveryType`] that selects how the requirement was built, and a
/// shared [`LaunchConstrainer`] handle consulted before the step offers
/// itself for matching and informed after a launch is accepted.
///
/// The recovery type and requirement never change for the life of the
/// step; changing strategy for a failing instance means removing this step
/// and creating a new one.
pub struct RecoveryStep {
    inner: DeploymentStep,
    recovery_type: RecoveryType,
    constrainer: Arc<dyn LaunchConstrainer>,
}

impl RecoveryStep {
    /// Build a recovery step for a pod instance.
    ///
    /// A transient recovery produces a normal relaunch requirement; a
    /// permanent recovery produces a replacement requirement. Construction
    /// never contacts the constrainer; admission happens in
    /// [`Step::start`].
    pub fn new(
        name: impl Into<String>,
        status: Status,
        pod_instance: PodInstance,
        tasks_to_launch: Vec<String>,
        recovery_type: RecoveryType,
        constrainer: Arc<dyn LaunchConstrainer>,
    ) -> Result<Self, RecoveryError> {
        let requirement = match recovery_type {
            RecoveryType::Permanent => {
                PodInstanceRequirement::permanent_replacement(pod_instance, tasks_to_launch)?
            }
            RecoveryType::Transient => {
                PodInstanceRequirement::create(pod_instance, tasks_to_launch)?
            }
        };

        Ok(Self {
            inner: DeploymentStep::new(name, status, requirement),
            recovery_type,
            constrainer,
        })
    }

    /// How this step recovers its instance. Immutable.
    pub fn recovery_type(&self) -> RecoveryType {
        self.recovery_type
    }

    /// The requirement this step was constructed with.
    pub fn requirement(&self) -> &PodInstanceRequirement {
        self.inner.requirement()
    }

    /// The pod instance this step recovers.
    pub fn pod_instance(&self) -> &PodInstance {
        self.inner.requirement().pod_instance()
    }
}

impl Step for RecoveryStep {
    fn id(&self) -> StepId {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn status(&self) -> Status {
        self.inner.status()
    }

    fn start(&mut self) -> Option<PodInstanceRequirement> {
        // Admission control happens here, not at construction: a denied
        // step simply is not offered for matching this cycle.
        if self.inner.status() == Status::Pending
            && !self.constrainer.can_launch(self.recovery_type)
        {
            return None;
        }
        self.inner.start()
    }

    fn update_offer_status(&mut self, recommendations: &[OfferRecommendation]) {
        self.inner.update_offer_status(recommendations);
        for recommendation in recommendations {
            if let Some(launch) = recommendation.as_launch() {
                self.constrainer.launch_happened(launch, self.recovery_type);
            }
        }
    }

    fn set_status(&mut self, status: Status) -> Result<(), StatusError> {
        self.inner.set_status(status)
    }

    fn message(&self) -> String {
        format!(
            "{} recovery_type: {}",
            self.inner.message(),
            self.recovery_type
        )
    }
}

impl PartialEq for RecoveryStep {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for RecoveryStep {}

impl std::hash::Hash for RecoveryStep {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Debug for RecoveryStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryStep")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("status", &self.status())
            .field("recovery_type", &self.recovery_type)
            .field("requirement", self.requirement())
            .finish()
    }
}
