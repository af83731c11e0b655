//! # caravel-plan
//!
//! Step and plan primitives for the caravel scheduler.
//!
//! The scheduler drives every multi-step operation (deployment, recovery)
//! through the same unit-of-work abstraction: a plan is a collection of
//! steps, each step owns a [`PodInstanceRequirement`] describing what to
//! place, and the offer-matching layer answers with
//! [`OfferRecommendation`]s. This crate defines that shared vocabulary:
//!
//! - [`Status`] — step lifecycle state and transition legality
//! - [`PodInstance`] / [`PodInstanceRequirement`] — what a step asks to place
//! - [`OfferRecommendation`] — what the matcher answered
//! - [`Step`] / [`DeploymentStep`] — the step contract and its generic base
//!
//! ## Design Principles
//!
//! - Steps are identified by a stable [`StepId`] assigned at construction;
//!   equality and hashing are defined over that id alone
//! - Requirements are fixed at step construction and validated up front
//! - Status transitions are enforced centrally, never per step type

mod offer;
mod pod;
mod status;
mod step;

pub use offer::{
    DestroyRecommendation, LaunchRecommendation, OfferRecommendation, ReserveRecommendation,
    UnreserveRecommendation,
};
pub use pod::{PodInstance, PodInstanceRequirement, RequirementError};
pub use status::{Status, StatusError};
pub use step::{DeploymentStep, Step, StepId};
