//! Recovery classification policy.

use crate::monitor::{FailedPod, FailureReason};
use crate::recovery_type::RecoveryType;

/// Decides how a failed pod instance comes back.
///
/// The engine fixes only the decision point (step construction); the rule
/// itself is deployment policy and swappable at manager construction.
pub trait RecoveryPolicy: Send + Sync {
    fn classify(&self, failure: &FailedPod) -> RecoveryType;
}

/// Default policy: replace instances whose state is unrecoverable, relaunch
/// everything else in place.
#[derive(Debug, Default)]
pub struct ReasonPolicy;

impl RecoveryPolicy for ReasonPolicy {
    fn classify(&self, failure: &FailedPod) -> RecoveryType {
        match failure.reason {
            FailureReason::Destroyed | FailureReason::ReservationInvalid => RecoveryType::Permanent,
            FailureReason::TaskFailed | FailureReason::TaskLost | FailureReason::NodeUnreachable => {
                RecoveryType::Transient
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use caravel_plan::PodInstance;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(FailureReason::TaskFailed, RecoveryType::Transient)]
    #[case(FailureReason::TaskLost, RecoveryType::Transient)]
    #[case(FailureReason::NodeUnreachable, RecoveryType::Transient)]
    #[case(FailureReason::Destroyed, RecoveryType::Permanent)]
    #[case(FailureReason::ReservationInvalid, RecoveryType::Permanent)]
    fn test_reason_policy(#[case] reason: FailureReason, #[case] expected: RecoveryType) {
        let failure = FailedPod {
            pod: PodInstance::new("broker", 0),
            failed_tasks: vec!["server".into()],
            reason,
        };
        assert_eq!(ReasonPolicy.classify(&failure), expected);
    }
}
