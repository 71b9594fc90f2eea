//! Running counts per activity, as seen by admission policies.

use std::collections::HashMap;
use std::sync::Arc;

/// Snapshot of running activities: name → count, plus the total.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunningCounts {
    by_activity: HashMap<Arc<str>, usize>,
    total: usize,
}

impl RunningCounts {
    /// Returns the running count of `activity` (0 if unknown).
    pub fn get(&self, activity: &str) -> usize {
        self.by_activity.get(activity).copied().unwrap_or(0)
    }

    /// Returns the number of running activities across all names.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Returns true if nothing is running.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Iterates over activities with a non-zero count.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.by_activity.iter().map(|(name, n)| (name.as_ref(), *n))
    }

    pub(crate) fn increment(&mut self, activity: &Arc<str>) -> usize {
        let n = self.by_activity.entry(Arc::clone(activity)).or_insert(0);
        *n += 1;
        self.total += 1;
        *n
    }

    /// Returns the remaining count, or `None` if `activity` was not running.
    pub(crate) fn decrement(&mut self, activity: &str) -> Option<usize> {
        let n = self.by_activity.get_mut(activity)?;
        *n -= 1;
        let left = *n;
        if left == 0 {
            self.by_activity.remove(activity);
        }
        self.total -= 1;
        Some(left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_track_total_and_drop_zero_entries() {
        let mut counts = RunningCounts::default();
        let upload: Arc<str> = Arc::from("upload");
        assert_eq!(counts.increment(&upload), 1);
        assert_eq!(counts.increment(&upload), 2);
        assert_eq!(counts.total(), 2);

        assert_eq!(counts.decrement("upload"), Some(1));
        assert_eq!(counts.decrement("upload"), Some(0));
        assert_eq!(counts.decrement("upload"), None);
        assert!(counts.is_empty());
        assert_eq!(counts.iter().count(), 0);
    }
}
