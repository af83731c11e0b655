//! Configuration for the recovery subsystem.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::constrain::{
    LaunchConstrainer, MinDelayConstrainer, RateLimitedConstrainer, Unconstrained,
};

/// Launch-throttling strategy selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum LaunchStrategy {
    /// Every launch is admitted.
    Unconstrained,

    /// Permanent launches must be at least `delay` apart.
    MinDelay { delay_secs: u64 },

    /// At most `max_launches` launches per type within a sliding window.
    RateLimited { max_launches: usize, window_secs: u64 },
}

/// Recovery subsystem configuration.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Interval between plan-synchronization cycles.
    pub sync_interval: Duration,

    /// Launch-throttling strategy.
    pub strategy: LaunchStrategy,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(10),
            strategy: LaunchStrategy::RateLimited {
                max_launches: 3,
                window_secs: 600,
            },
        }
    }
}

impl RecoveryConfig {
    /// Load configuration from environment variables.
    ///
    /// - `CARAVEL_RECOVERY_SYNC_INTERVAL_SECS` (default 10)
    /// - `CARAVEL_RECOVERY_LAUNCH_STRATEGY`:
    ///   `unconstrained` | `min-delay` | `rate-limited` (default)
    /// - `CARAVEL_RECOVERY_LAUNCH_MIN_DELAY_SECS` (default 60)
    /// - `CARAVEL_RECOVERY_LAUNCH_MAX_PER_WINDOW` (default 3)
    /// - `CARAVEL_RECOVERY_LAUNCH_WINDOW_SECS` (default 600)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let sync_interval = std::env::var("CARAVEL_RECOVERY_SYNC_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.sync_interval);

        let strategy_name = std::env::var("CARAVEL_RECOVERY_LAUNCH_STRATEGY")
            .unwrap_or_else(|_| "rate-limited".to_string());

        let strategy = match strategy_name.as_str() {
            "unconstrained" => LaunchStrategy::Unconstrained,
            "min-delay" => {
                let delay_secs = std::env::var("CARAVEL_RECOVERY_LAUNCH_MIN_DELAY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60);
                LaunchStrategy::MinDelay { delay_secs }
            }
            "rate-limited" => {
                let max_launches = std::env::var("CARAVEL_RECOVERY_LAUNCH_MAX_PER_WINDOW")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3);
                let window_secs = std::env::var("CARAVEL_RECOVERY_LAUNCH_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600);
                LaunchStrategy::RateLimited {
                    max_launches,
                    window_secs,
                }
            }
            other => bail!("unknown launch strategy {other:?}"),
        };

        Ok(Self {
            sync_interval,
            strategy,
        })
    }

    /// Build the shared constrainer for this configuration.
    pub fn build_constrainer(&self) -> Arc<dyn LaunchConstrainer> {
        match self.strategy {
            LaunchStrategy::Unconstrained => Arc::new(Unconstrained::new()),
            LaunchStrategy::MinDelay { delay_secs } => {
                Arc::new(MinDelayConstrainer::new(Duration::from_secs(delay_secs)))
            }
            LaunchStrategy::RateLimited {
                max_launches,
                window_secs,
            } => Arc::new(RateLimitedConstrainer::new(
                max_launches,
                Duration::from_secs(window_secs),
            )),
        }
    }
}
