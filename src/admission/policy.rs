//! # Admission policies
//!
//! An [`AdmissionPolicy`] decides how many activities may run at once, which
//! pending request goes first, and whether a particular activity may start
//! given what is already running.
//!
//! Queries (`max_concurrency`, `priority`, `can_admit`) run under the controller
//! lock and must be quick. Notifications (`on_begin`, `on_end`) run after the
//! lock is released with a snapshot of the counts.
//!
//! A panic in any of these closes the controller.

use crate::admission::counts::RunningCounts;

/// Rules applied by an [`AdmissionController`](crate::AdmissionController).
pub trait AdmissionPolicy: Send + Sync + 'static {
    /// Global cap on running activities. `0` means unlimited.
    fn max_concurrency(&self) -> usize;

    /// Priority of a new request; higher runs first. Captured once at enqueue time.
    fn priority(&self, _activity: &str) -> i32 {
        0
    }

    /// Whether `activity` may start now. Re-evaluated on every admission attempt.
    fn can_admit(&self, _activity: &str, _running: &RunningCounts) -> bool {
        true
    }

    /// Called after `activity` was admitted.
    fn on_begin(&self, _activity: &str, _running: &RunningCounts) {}

    /// Called after `activity` ended.
    fn on_end(&self, _activity: &str, _running: &RunningCounts) {}
}

/// Fixed global cap; every activity has priority 0 and is always admissible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaxActivities(pub usize);

impl AdmissionPolicy for MaxActivities {
    fn max_concurrency(&self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_activities_defaults() {
        let policy = MaxActivities(2);
        assert_eq!(policy.max_concurrency(), 2);
        assert_eq!(policy.priority("anything"), 0);
        assert!(policy.can_admit("anything", &RunningCounts::default()));
    }
}
