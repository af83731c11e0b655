//! Offer recommendations from the resource-matching layer.
//!
//! Matching a step's requirement against cluster offers produces zero or
//! more recommendations. Plan code treats them opaquely except for one
//! distinction: launch recommendations are the only kind that represents a
//! task actually starting, and the only kind the recovery throttle counts.

use serde::{Deserialize, Serialize};

use crate::pod::PodInstance;

/// A proposed action against cluster resources, produced by offer matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OfferRecommendation {
    /// Launch tasks on a node using an accepted offer.
    Launch(LaunchRecommendation),

    /// Reserve resources without launching anything.
    Reserve(ReserveRecommendation),

    /// Release a previous reservation.
    Unreserve(UnreserveRecommendation),

    /// Destroy a persistent volume.
    Destroy(DestroyRecommendation),
}

impl OfferRecommendation {
    /// Returns the launch payload if this recommendation is a launch.
    pub fn as_launch(&self) -> Option<&LaunchRecommendation> {
        match self {
            Self::Launch(launch) => Some(launch),
            _ => None,
        }
    }
}

/// An accepted launch: these tasks are starting on this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRecommendation {
    /// Offer the launch was built from.
    pub offer_id: String,

    /// Node the tasks will run on.
    pub node_id: String,

    /// Pod instance being launched.
    pub pod_instance: PodInstance,

    /// Task names included in the launch operation.
    pub task_names: Vec<String>,
}

/// A reservation-only recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveRecommendation {
    pub offer_id: String,
    pub node_id: String,
    pub resource_names: Vec<String>,
}

/// An unreserve recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreserveRecommendation {
    pub offer_id: String,
    pub node_id: String,
    pub resource_names: Vec<String>,
}

/// A volume-destroy recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyRecommendation {
    pub offer_id: String,
    pub node_id: String,
    pub volume_id: String,
}
