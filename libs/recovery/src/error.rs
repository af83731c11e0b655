//! Recovery engine errors.
//!
//! Only genuinely failed operations surface here. Admission denial and
//! offer rejection are normal throttling outcomes and are expressed as
//! step state, not errors.

use caravel_plan::{RequirementError, StatusError, StepId};
use thiserror::Error;

/// Errors from the recovery engine.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Building a step's requirement failed; fatal to that step only.
    #[error("requirement construction failed: {0}")]
    Requirement(#[from] RequirementError),

    /// The failure monitor could not be queried.
    #[error("failure monitor error: {0}")]
    Monitor(#[source] anyhow::Error),

    /// A status update referenced a step the plan does not contain.
    #[error("unknown step: {0}")]
    UnknownStep(StepId),

    /// An externally-requested status transition was illegal.
    #[error(transparent)]
    Status(#[from] StatusError),
}
