//! Recovery classification.

use serde::{Deserialize, Serialize};

/// How a failed pod instance comes back.
///
/// Decided once, at step construction; changing strategy for a failing
/// instance means destroying the step and creating a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryType {
    /// Relaunch in place: reuse reserved resources, persistent volumes,
    /// and task identity.
    Transient,

    /// Replace the instance: abandon reservations and volumes, acquire a
    /// fresh identity.
    Permanent,
}

impl RecoveryType {
    /// Lowercase label used in step messages and configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        }
    }
}

impl std::fmt::Display for RecoveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for RecoveryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transient" => Ok(Self::Transient),
            "permanent" => Ok(Self::Permanent),
            other => Err(format!("unknown recovery type {other:?}")),
        }
    }
}
