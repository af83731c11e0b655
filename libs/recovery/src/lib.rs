//! # caravel-recovery
//!
//! Recovery planning and launch throttling for the caravel scheduler.
//!
//! When a running pod instance fails, is lost, or is destroyed, the
//! scheduler must bring it back without violating two invariants:
//!
//! - at most one outstanding launch attempt per pod instance, and
//! - a bounded relaunch pace across the whole service, so a bad node or a
//!   crash loop cannot turn into a relaunch storm.
//!
//! The pieces:
//!
//! - [`RecoveryType`] — transient (relaunch in place) vs permanent
//!   (replace the instance, abandoning reservations and volumes)
//! - [`LaunchConstrainer`] — shared admission gate over relaunch pace
//! - [`RecoveryStep`] — one launch attempt, driven by the generic step
//!   engine through the [`Step`](caravel_plan::Step) contract
//! - [`RecoveryPlanManager`] — keeps the step set in sync with the set of
//!   currently-failed pod instances, one step per instance
//! - [`RecoveryWorker`] — periodic loop driving the manager
//!
//! Throttling is split in two on purpose: `can_launch` is consulted before
//! a step offers itself for matching, and `launch_happened` is recorded
//! only when the matcher actually produced a launch. Speculative or
//! rejected recommendations never advance the throttle.

pub mod config;
pub mod constrain;
mod error;
mod monitor;
mod plan_manager;
mod policy;
mod recovery_type;
mod step;
mod worker;

pub use config::{LaunchStrategy, RecoveryConfig};
pub use constrain::{
    LaunchConstrainer, MinDelayConstrainer, RateLimitedConstrainer, Unconstrained,
};
pub use error::RecoveryError;
pub use monitor::{FailedPod, FailureMonitor, FailureReason, MockFailureMonitor};
pub use plan_manager::{RecoveryPlanManager, StepSnapshot, SyncStats};
pub use policy::{ReasonPolicy, RecoveryPolicy};
pub use recovery_type::RecoveryType;
pub use step::RecoveryStep;
pub use worker::RecoveryWorker;
