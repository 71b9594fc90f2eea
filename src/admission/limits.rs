//! Ready-made policy with per-activity caps and priorities.

use std::collections::HashMap;

use crate::admission::counts::RunningCounts;
use crate::admission::policy::AdmissionPolicy;

#[derive(Clone, Copy, Debug, Default)]
struct Rule {
    max: Option<usize>,
    priority: i32,
}

/// Global cap plus optional per-activity caps and priorities.
///
/// # Example
/// ```
/// use statevisor::{ActivityLimits, AdmissionPolicy, RunningCounts};
///
/// let limits = ActivityLimits::new(8)
///     .with_max("db", 2)
///     .with_priority("interactive", 10);
///
/// assert_eq!(limits.max_concurrency(), 8);
/// assert_eq!(limits.priority("interactive"), 10);
/// assert_eq!(limits.priority("batch"), 0);
/// assert!(limits.can_admit("db", &RunningCounts::default()));
/// ```
#[derive(Clone, Debug, Default)]
pub struct ActivityLimits {
    max_total: usize,
    rules: HashMap<String, Rule>,
}

impl ActivityLimits {
    /// Creates limits with a global cap (`0` = unlimited) and no per-activity rules.
    pub fn new(max_total: usize) -> Self {
        Self {
            max_total,
            rules: HashMap::new(),
        }
    }

    /// Caps concurrent instances of `activity`.
    pub fn with_max(mut self, activity: impl Into<String>, max: usize) -> Self {
        self.rules.entry(activity.into()).or_default().max = Some(max);
        self
    }

    /// Sets the priority of `activity` (default 0, higher first).
    pub fn with_priority(mut self, activity: impl Into<String>, priority: i32) -> Self {
        self.rules.entry(activity.into()).or_default().priority = priority;
        self
    }
}

impl AdmissionPolicy for ActivityLimits {
    fn max_concurrency(&self) -> usize {
        self.max_total
    }

    fn priority(&self, activity: &str) -> i32 {
        self.rules.get(activity).map_or(0, |r| r.priority)
    }

    fn can_admit(&self, activity: &str, running: &RunningCounts) -> bool {
        match self.rules.get(activity).and_then(|r| r.max) {
            Some(max) => running.get(activity) < max,
            None => true,
        }
    }
}
