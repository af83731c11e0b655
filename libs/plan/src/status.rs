//! Step lifecycle status.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by status transitions.
#[derive(Debug, Error)]
pub enum StatusError {
    /// The requested transition is not allowed by the step state machine.
    #[error("illegal status transition: {from} -> {to}")]
    IllegalTransition { from: Status, to: Status },
}

/// Lifecycle state of a step.
///
/// The normal path is `Pending -> Prepared -> Starting -> Complete`.
/// `Error` is absorbing and reachable from any non-terminal state.
/// A step that received no usable offers falls back from `Prepared` or
/// `Starting` to `Pending` and is retried on a later cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Step exists but has not been offered for matching.
    Pending,

    /// Step has produced its requirement and is awaiting offers.
    Prepared,

    /// A launch was accepted; the task is coming up.
    Starting,

    /// The step finished successfully.
    Complete,

    /// The step failed terminally.
    Error,
}

impl Status {
    /// Returns true if the step will never change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Returns true if the step finished successfully.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Whether a transition from `self` to `to` is legal.
    ///
    /// Self-transitions are legal no-ops. Backward transitions to
    /// `Pending` model offer rejection and retry.
    pub fn can_transition(&self, to: Status) -> bool {
        if *self == to {
            return true;
        }
        match (self, to) {
            (s, Status::Error) => !s.is_terminal(),
            (Status::Pending, Status::Prepared) => true,
            (Status::Prepared, Status::Starting | Status::Pending) => true,
            (Status::Starting, Status::Complete | Status::Pending) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Prepared => "prepared",
            Self::Starting => "starting",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}
