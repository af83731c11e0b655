//! Pod identity and placement requirements.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors building a [`PodInstanceRequirement`].
#[derive(Debug, Error)]
pub enum RequirementError {
    /// A requirement must launch at least one task.
    #[error("requirement for {pod} has an empty task set")]
    EmptyTaskSet { pod: String },

    /// Task names within one requirement must be unique.
    #[error("requirement for {pod} names task {task:?} more than once")]
    DuplicateTask { pod: String, task: String },
}

/// One instance of a deployed service component.
///
/// Identity is (pod type, index) and never changes; replacement of a failed
/// instance produces a new launch under the same identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PodInstance {
    pod_type: String,
    index: u32,
}

impl PodInstance {
    /// Create an instance identity.
    pub fn new(pod_type: impl Into<String>, index: u32) -> Self {
        Self {
            pod_type: pod_type.into(),
            index,
        }
    }

    /// The pod type this instance belongs to.
    pub fn pod_type(&self) -> &str {
        &self.pod_type
    }

    /// Index of this instance within its pod type.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Canonical name, e.g. `broker-2`.
    pub fn name(&self) -> String {
        format!("{}-{}", self.pod_type, self.index)
    }
}

impl std::fmt::Display for PodInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.pod_type, self.index)
    }
}

/// A request to the offer-matching layer: place this pod instance and
/// launch these tasks.
///
/// A step owns exactly one requirement, fixed at construction. The
/// `replacement` flag distinguishes an in-place relaunch (reuse existing
/// reservations, volumes, and task identity) from a permanent replacement
/// (abandon reservations and volumes, acquire a fresh identity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodInstanceRequirement {
    pod_instance: PodInstance,
    tasks_to_launch: Vec<String>,
    replacement: bool,
}

impl PodInstanceRequirement {
    /// Build a normal launch/relaunch requirement.
    pub fn create(
        pod_instance: PodInstance,
        tasks_to_launch: Vec<String>,
    ) -> Result<Self, RequirementError> {
        Self::build(pod_instance, tasks_to_launch, false)
    }

    /// Build a discard-and-replace requirement.
    ///
    /// The matcher treats this as a fresh placement: existing reservations
    /// and persistent volumes for the instance are abandoned.
    pub fn permanent_replacement(
        pod_instance: PodInstance,
        tasks_to_launch: Vec<String>,
    ) -> Result<Self, RequirementError> {
        Self::build(pod_instance, tasks_to_launch, true)
    }

    fn build(
        pod_instance: PodInstance,
        tasks_to_launch: Vec<String>,
        replacement: bool,
    ) -> Result<Self, RequirementError> {
        if tasks_to_launch.is_empty() {
            return Err(RequirementError::EmptyTaskSet {
                pod: pod_instance.name(),
            });
        }

        let mut seen = HashSet::new();
        for task in &tasks_to_launch {
            if !seen.insert(task.as_str()) {
                return Err(RequirementError::DuplicateTask {
                    pod: pod_instance.name(),
                    task: task.clone(),
                });
            }
        }

        Ok(Self {
            pod_instance,
            tasks_to_launch,
            replacement,
        })
    }

    /// The pod instance this requirement places.
    pub fn pod_instance(&self) -> &PodInstance {
        &self.pod_instance
    }

    /// Task names to launch within the pod.
    pub fn tasks_to_launch(&self) -> &[String] {
        &self.tasks_to_launch
    }

    /// True if this requirement replaces the instance instead of
    /// relaunching it in place.
    pub fn is_replacement(&self) -> bool {
        self.replacement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_instance_name() {
        let pod = PodInstance::new("broker", 2);
        assert_eq!(pod.name(), "broker-2");
        assert_eq!(pod.to_string(), "broker-2");
    }

    #[test]
    fn test_create_is_not_replacement() {
        let req =
            PodInstanceRequirement::create(PodInstance::new("broker", 0), vec!["server".into()])
                .unwrap();
        assert!(!req.is_replacement());
        assert_eq!(req.tasks_to_launch(), ["server".to_string()]);
    }

    #[test]
    fn test_permanent_replacement_flag() {
        let req = PodInstanceRequirement::permanent_replacement(
            PodInstance::new("broker", 0),
            vec!["server".into()],
        )
        .unwrap();
        assert!(req.is_replacement());
    }

    #[test]
    fn test_empty_task_set_rejected() {
        let result = PodInstanceRequirement::create(PodInstance::new("broker", 0), vec![]);
        assert!(matches!(
            result.unwrap_err(),
            RequirementError::EmptyTaskSet { .. }
        ));
    }

    #[test]
    fn test_duplicate_task_rejected() {
        let result = PodInstanceRequirement::create(
            PodInstance::new("broker", 0),
            vec!["server".into(), "server".into()],
        );
        assert!(matches!(
            result.unwrap_err(),
            RequirementError::DuplicateTask { .. }
        ));
    }

    #[test]
    fn test_requirement_json_roundtrip() {
        let req = PodInstanceRequirement::permanent_replacement(
            PodInstance::new("index", 3),
            vec!["node".into(), "sidecar".into()],
        )
        .unwrap();
        let json = serde_json::to_string(&req).unwrap();
        let parsed: PodInstanceRequirement = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, req);
    }
}
