//! Launch admission control.
//!
//! One constrainer is shared by every recovery step in the plan; it is the
//! process-wide throttle window for the recovery subsystem, not owned by
//! any single step. Steps hold an `Arc<dyn LaunchConstrainer>` handle.
//!
//! The contract separates the admission query from the record call:
//! [`LaunchConstrainer::can_launch`] gates whether a step may offer itself
//! for matching this cycle, and [`LaunchConstrainer::launch_happened`] is
//! invoked only for recommendations that are actual launches. Recommendations
//! that were proposed but not accepted never advance the throttle.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use caravel_plan::LaunchRecommendation;
use tracing::debug;

use crate::recovery_type::RecoveryType;

/// Admission gate bounding the pace of relaunches.
pub trait LaunchConstrainer: Send + Sync {
    /// Whether a launch of this type is currently permitted.
    ///
    /// Pure query: safe to call repeatedly from the evaluation path of many
    /// steps; never mutates throttle state.
    fn can_launch(&self, recovery_type: RecoveryType) -> bool;

    /// Record that a launch of this type actually occurred.
    ///
    /// Called exactly once per accepted launch recommendation. The
    /// constrainer inspects only the recommendation and the type, never pod
    /// identity; the internal update is serialized so concurrent calls from
    /// different steps lose nothing.
    fn launch_happened(&self, recommendation: &LaunchRecommendation, recovery_type: RecoveryType);
}

/// Per-type launch totals, for observability and tests.
#[derive(Debug, Default)]
struct LaunchTotals {
    transient: AtomicU64,
    permanent: AtomicU64,
}

impl LaunchTotals {
    fn record(&self, recovery_type: RecoveryType) {
        match recovery_type {
            RecoveryType::Transient => self.transient.fetch_add(1, Ordering::Relaxed),
            RecoveryType::Permanent => self.permanent.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn get(&self, recovery_type: RecoveryType) -> u64 {
        match recovery_type {
            RecoveryType::Transient => self.transient.load(Ordering::Relaxed),
            RecoveryType::Permanent => self.permanent.load(Ordering::Relaxed),
        }
    }
}

/// No throttling: every launch is admitted.
#[derive(Debug, Default)]
pub struct Unconstrained {
    totals: LaunchTotals,
}

impl Unconstrained {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total launches recorded for a type since construction.
    pub fn launches_recorded(&self, recovery_type: RecoveryType) -> u64 {
        self.totals.get(recovery_type)
    }
}

impl LaunchConstrainer for Unconstrained {
    fn can_launch(&self, _recovery_type: RecoveryType) -> bool {
        true
    }

    fn launch_happened(&self, recommendation: &LaunchRecommendation, recovery_type: RecoveryType) {
        self.totals.record(recovery_type);
        debug!(
            pod = %recommendation.pod_instance,
            recovery_type = %recovery_type,
            "Recorded launch (unconstrained)"
        );
    }
}

/// Enforces a minimum delay between permanent launches.
///
/// Replacement launches destroy reserved state, so they are paced;
/// in-place relaunches are always admitted.
#[derive(Debug)]
pub struct MinDelayConstrainer {
    delay: Duration,
    last_permanent: Mutex<Option<Instant>>,
    totals: LaunchTotals,
}

impl MinDelayConstrainer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_permanent: Mutex::new(None),
            totals: LaunchTotals::default(),
        }
    }

    /// Total launches recorded for a type since construction.
    pub fn launches_recorded(&self, recovery_type: RecoveryType) -> u64 {
        self.totals.get(recovery_type)
    }

    fn lock_last(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        // Throttle state stays consistent even if a recording thread
        // panicked mid-update; the value is a single Instant.
        self.last_permanent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LaunchConstrainer for MinDelayConstrainer {
    fn can_launch(&self, recovery_type: RecoveryType) -> bool {
        match recovery_type {
            RecoveryType::Transient => true,
            RecoveryType::Permanent => match *self.lock_last() {
                Some(last) => last.elapsed() >= self.delay,
                None => true,
            },
        }
    }

    fn launch_happened(&self, recommendation: &LaunchRecommendation, recovery_type: RecoveryType) {
        self.totals.record(recovery_type);
        if recovery_type == RecoveryType::Permanent {
            *self.lock_last() = Some(Instant::now());
        }
        debug!(
            pod = %recommendation.pod_instance,
            recovery_type = %recovery_type,
            "Recorded launch (min-delay)"
        );
    }
}

/// Sliding-window launch budget: at most `max_launches` launches of a given
/// type within `window`.
///
/// Each type has its own budget, so a transient crash loop cannot starve
/// permanent replacements and vice versa.
#[derive(Debug)]
pub struct RateLimitedConstrainer {
    max_launches: usize,
    window: Duration,
    history: Mutex<VecDeque<(Instant, RecoveryType)>>,
    totals: LaunchTotals,
}

impl RateLimitedConstrainer {
    pub fn new(max_launches: usize, window: Duration) -> Self {
        Self {
            max_launches,
            window,
            history: Mutex::new(VecDeque::new()),
            totals: LaunchTotals::default(),
        }
    }

    /// Total launches recorded for a type since construction.
    pub fn launches_recorded(&self, recovery_type: RecoveryType) -> u64 {
        self.totals.get(recovery_type)
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, VecDeque<(Instant, RecoveryType)>> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn in_window(&self, history: &VecDeque<(Instant, RecoveryType)>, ty: RecoveryType) -> usize {
        let now = Instant::now();
        history
            .iter()
            .filter(|(at, t)| *t == ty && now.duration_since(*at) < self.window)
            .count()
    }
}

impl LaunchConstrainer for RateLimitedConstrainer {
    fn can_launch(&self, recovery_type: RecoveryType) -> bool {
        let history = self.lock_history();
        self.in_window(&history, recovery_type) < self.max_launches
    }

    fn launch_happened(&self, recommendation: &LaunchRecommendation, recovery_type: RecoveryType) {
        let now = Instant::now();
        {
            let mut history = self.lock_history();
            while let Some((at, _)) = history.front() {
                if now.duration_since(*at) >= self.window {
                    history.pop_front();
                } else {
                    break;
                }
            }
            history.push_back((now, recovery_type));
        }
        self.totals.record(recovery_type);
        debug!(
            pod = %recommendation.pod_instance,
            recovery_type = %recovery_type,
            "Recorded launch (rate-limited)"
        );
    }
}

#[cfg(test)]
mod tests {
    use caravel_plan::PodInstance;

    use super::*;

    fn launch(pod: &str, index: u32) -> LaunchRecommendation {
        LaunchRecommendation {
            offer_id: format!("offer-{pod}-{index}"),
            node_id: "node-1".into(),
            pod_instance: PodInstance::new(pod, index),
            task_names: vec!["server".into()],
        }
    }

    #[test]
    fn test_unconstrained_always_allows() {
        let constrainer = Unconstrained::new();
        for _ in 0..100 {
            assert!(constrainer.can_launch(RecoveryType::Permanent));
            constrainer.launch_happened(&launch("broker", 0), RecoveryType::Permanent);
        }
        assert_eq!(constrainer.launches_recorded(RecoveryType::Permanent), 100);
        assert_eq!(constrainer.launches_recorded(RecoveryType::Transient), 0);
    }

    #[test]
    fn test_min_delay_blocks_back_to_back_permanent() {
        let constrainer = MinDelayConstrainer::new(Duration::from_secs(60));

        assert!(constrainer.can_launch(RecoveryType::Permanent));
        constrainer.launch_happened(&launch("broker", 0), RecoveryType::Permanent);
        assert!(!constrainer.can_launch(RecoveryType::Permanent));
        // Transient relaunches are never paced by this strategy.
        assert!(constrainer.can_launch(RecoveryType::Transient));
    }

    #[test]
    fn test_min_delay_ignores_transient_launches() {
        let constrainer = MinDelayConstrainer::new(Duration::from_secs(60));
        constrainer.launch_happened(&launch("broker", 0), RecoveryType::Transient);
        assert!(constrainer.can_launch(RecoveryType::Permanent));
    }

    #[test]
    fn test_min_delay_allows_after_delay() {
        let constrainer = MinDelayConstrainer::new(Duration::from_millis(10));
        constrainer.launch_happened(&launch("broker", 0), RecoveryType::Permanent);
        assert!(!constrainer.can_launch(RecoveryType::Permanent));
        std::thread::sleep(Duration::from_millis(20));
        assert!(constrainer.can_launch(RecoveryType::Permanent));
    }

    #[test]
    fn test_rate_limit_budget_per_type() {
        let constrainer = RateLimitedConstrainer::new(2, Duration::from_secs(60));

        constrainer.launch_happened(&launch("broker", 0), RecoveryType::Transient);
        constrainer.launch_happened(&launch("broker", 1), RecoveryType::Transient);

        // Transient budget exhausted, permanent budget untouched.
        assert!(!constrainer.can_launch(RecoveryType::Transient));
        assert!(constrainer.can_launch(RecoveryType::Permanent));
    }

    #[test]
    fn test_rate_limit_window_expiry() {
        let constrainer = RateLimitedConstrainer::new(1, Duration::from_millis(10));
        constrainer.launch_happened(&launch("broker", 0), RecoveryType::Transient);
        assert!(!constrainer.can_launch(RecoveryType::Transient));
        std::thread::sleep(Duration::from_millis(20));
        assert!(constrainer.can_launch(RecoveryType::Transient));
    }

    #[test]
    fn test_can_launch_does_not_consume_budget() {
        let constrainer = RateLimitedConstrainer::new(1, Duration::from_secs(60));
        for _ in 0..50 {
            assert!(constrainer.can_launch(RecoveryType::Permanent));
        }
        constrainer.launch_happened(&launch("broker", 0), RecoveryType::Permanent);
        assert!(!constrainer.can_launch(RecoveryType::Permanent));
    }

    #[test]
    fn test_concurrent_recording_loses_nothing() {
        let constrainer = std::sync::Arc::new(RateLimitedConstrainer::new(
            1000,
            Duration::from_secs(60),
        ));

        let handles: Vec<_> = (0..8u32)
            .map(|worker| {
                let constrainer = constrainer.clone();
                std::thread::spawn(move || {
                    for i in 0..50u32 {
                        constrainer
                            .launch_happened(&launch("broker", worker * 50 + i), RecoveryType::Transient);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(constrainer.launches_recorded(RecoveryType::Transient), 400);
    }
}
