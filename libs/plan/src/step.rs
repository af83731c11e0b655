//! The step contract and its generic base implementation.
//!
//! The scheduler engine drives any step through the same capability
//! interface: ask it to produce a requirement ([`Step::start`]), feed it the
//! matcher's answer ([`Step::update_offer_status`]), and read its status.
//! Specialized steps (recovery, deployment variants) wrap
//! [`DeploymentStep`] by value and add behavior around these calls; they
//! never redefine transition legality.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::offer::OfferRecommendation;
use crate::pod::PodInstanceRequirement;
use crate::status::{Status, StatusError};

/// Stable identity of a step, assigned at construction.
///
/// Formatted as `step_{ulid}`. Two steps for the same pod instance created
/// at different times are distinct entities; all step equality and hashing
/// is defined over this id alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepId(Ulid);

impl StepId {
    /// Prefix for the canonical string form.
    pub const PREFIX: &'static str = "step";

    /// Generate a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse the canonical `step_{ulid}` form.
    pub fn parse(s: &str) -> Result<Self, String> {
        let Some((prefix, ulid_str)) = s.split_once('_') else {
            return Err(format!("missing separator in step id {s:?}"));
        };
        if prefix != Self::PREFIX {
            return Err(format!("invalid step id prefix {prefix:?}"));
        }
        let ulid = ulid_str
            .parse::<Ulid>()
            .map_err(|e| format!("invalid ulid in step id: {e}"))?;
        Ok(Self(ulid))
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.0)
    }
}

impl std::str::FromStr for StepId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for StepId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for StepId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Capability interface the scheduler engine drives steps through.
pub trait Step: Send + Sync {
    /// Stable identity.
    fn id(&self) -> StepId;

    /// Operator-facing name.
    fn name(&self) -> &str;

    /// Current lifecycle status.
    fn status(&self) -> Status;

    /// Offer this step for resource matching.
    ///
    /// Returns the requirement to match if the step is eligible this
    /// cycle, `None` otherwise. Moving `Pending -> Prepared` happens here.
    fn start(&mut self) -> Option<PodInstanceRequirement>;

    /// Receive the recommendations offer matching produced for this
    /// step's requirement.
    fn update_offer_status(&mut self, recommendations: &[OfferRecommendation]);

    /// Set status from external feedback (task reached running, failed).
    fn set_status(&mut self, status: Status) -> Result<(), StatusError>;

    /// Human-readable status line for operator surfaces.
    fn message(&self) -> String;
}

/// Generic base step: one requirement driven to completion.
#[derive(Debug, Clone)]
pub struct DeploymentStep {
    id: StepId,
    name: String,
    status: Status,
    requirement: PodInstanceRequirement,
    message: String,
}

impl DeploymentStep {
    /// Create a step with a fixed requirement.
    pub fn new(name: impl Into<String>, status: Status, requirement: PodInstanceRequirement) -> Self {
        let name = name.into();
        let message = format!("step {name} created");
        Self {
            id: StepId::new(),
            name,
            status,
            requirement,
            message,
        }
    }

    /// The requirement this step was constructed with.
    pub fn requirement(&self) -> &PodInstanceRequirement {
        &self.requirement
    }

    fn transition(&mut self, to: Status, message: String) -> Result<(), StatusError> {
        if !self.status.can_transition(to) {
            return Err(StatusError::IllegalTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.message = message;
        Ok(())
    }
}

impl Step for DeploymentStep {
    fn id(&self) -> StepId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> Status {
        self.status
    }

    fn start(&mut self) -> Option<PodInstanceRequirement> {
        if self.status != Status::Pending {
            return None;
        }
        // Pending -> Prepared is always legal.
        let _ = self.transition(
            Status::Prepared,
            format!("awaiting offers for {}", self.requirement.pod_instance()),
        );
        Some(self.requirement.clone())
    }

    fn update_offer_status(&mut self, recommendations: &[OfferRecommendation]) {
        let launched = recommendations.iter().any(|r| r.as_launch().is_some());
        let result = if launched {
            self.transition(
                Status::Starting,
                format!("launch accepted for {}", self.requirement.pod_instance()),
            )
        } else {
            self.transition(
                Status::Pending,
                format!(
                    "no launch for {}, retrying next cycle",
                    self.requirement.pod_instance()
                ),
            )
        };
        // A terminal step may still receive stale matcher output; drop it.
        let _ = result;
    }

    fn set_status(&mut self, status: Status) -> Result<(), StatusError> {
        self.transition(status, format!("status set to {status}"))
    }

    fn message(&self) -> String {
        self.message.clone()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::offer::{LaunchRecommendation, ReserveRecommendation};
    use crate::pod::PodInstance;

    fn requirement() -> PodInstanceRequirement {
        PodInstanceRequirement::create(PodInstance::new("broker", 0), vec!["server".into()])
            .unwrap()
    }

    fn launch_rec() -> OfferRecommendation {
        OfferRecommendation::Launch(LaunchRecommendation {
            offer_id: "offer-1".into(),
            node_id: "node-1".into(),
            pod_instance: PodInstance::new("broker", 0),
            task_names: vec!["server".into()],
        })
    }

    #[test]
    fn test_step_id_roundtrip() {
        let id = StepId::new();
        let parsed: StepId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_step_id_invalid_prefix() {
        assert!(StepId::parse("pod_01HV4Z2WQXKJNM8GPQY6VBKC3D").is_err());
        assert!(StepId::parse("step01HV4Z2WQXKJNM8GPQY6VBKC3D").is_err());
    }

    #[test]
    fn test_start_produces_requirement_once() {
        let mut step = DeploymentStep::new("recover-broker-0", Status::Pending, requirement());
        assert!(step.start().is_some());
        assert_eq!(step.status(), Status::Prepared);
        // Already prepared: not offered again until it falls back.
        assert!(step.start().is_none());
    }

    #[test]
    fn test_launch_moves_to_starting() {
        let mut step = DeploymentStep::new("recover-broker-0", Status::Pending, requirement());
        step.start();
        step.update_offer_status(&[launch_rec()]);
        assert_eq!(step.status(), Status::Starting);
    }

    #[test]
    fn test_no_launch_falls_back_to_pending() {
        let mut step = DeploymentStep::new("recover-broker-0", Status::Pending, requirement());
        step.start();
        let reserve = OfferRecommendation::Reserve(ReserveRecommendation {
            offer_id: "offer-2".into(),
            node_id: "node-1".into(),
            resource_names: vec!["mem".into()],
        });
        step.update_offer_status(&[reserve]);
        assert_eq!(step.status(), Status::Pending);
        assert!(step.start().is_some());
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut step = DeploymentStep::new("recover-broker-0", Status::Pending, requirement());
        assert!(step.set_status(Status::Complete).is_err());
        assert_eq!(step.status(), Status::Pending);
    }

    #[test]
    fn test_complete_after_starting() {
        let mut step = DeploymentStep::new("recover-broker-0", Status::Pending, requirement());
        step.start();
        step.update_offer_status(&[launch_rec()]);
        step.set_status(Status::Complete).unwrap();
        assert!(step.status().is_complete());
    }

    proptest! {
        #[test]
        fn prop_step_id_roundtrip(ms in 0u64..=281474976710655u64, rand in any::<u128>()) {
            let ulid = Ulid::from_parts(ms, rand);
            let id = StepId(ulid);
            let parsed = StepId::parse(&id.to_string()).unwrap();
            prop_assert_eq!(id, parsed);
        }
    }
}
