//! # Resolution abstraction.
//!
//! This module defines the [`Solve`] trait implemented by user code and the
//! [`Resolution`] it reports back to the [`Resolver`](crate::Resolver) worker.
//!
//! A `solve()` call inspects the current state, acts to move it closer to the
//! desired one, and tells the worker whether more work is needed.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SolveError;

/// Outcome of one `solve()` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The state matches what is desired; the worker may go idle.
    Resolved,
    /// More work is required.
    ///   - `retry_in: None` → call `solve()` again immediately
    ///   - `retry_in: Some(d)` → sleep `d` first (cancellable by `stop()`)
    Pending { retry_in: Option<Duration> },
}

impl Resolution {
    /// Not resolved yet; call again immediately.
    #[inline]
    pub fn retry() -> Self {
        Resolution::Pending { retry_in: None }
    }

    /// Not resolved yet; call again after `delay`.
    ///
    /// A zero delay is the same as [`Resolution::retry`].
    #[inline]
    pub fn retry_in(delay: Duration) -> Self {
        Resolution::Pending {
            retry_in: (delay > Duration::ZERO).then_some(delay),
        }
    }

    /// Returns true for [`Resolution::Resolved`].
    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved)
    }
}

/// # State resolution callback.
///
/// Implementations own their synchronization: the resolver guarantees that at
/// most one `solve()` runs at a time for a given resolver, nothing more.
///
/// Returning `Err` (or panicking) is fatal for the resolver: it records the
/// fault, stops itself and never calls `solve()` again.
///
/// # Example
/// ```
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use async_trait::async_trait;
/// use statevisor::{Resolution, Solve, SolveError};
///
/// struct Drain { backlog: AtomicU32 }
///
/// #[async_trait]
/// impl Solve for Drain {
///     async fn solve(&self) -> Result<Resolution, SolveError> {
///         let left = self.backlog.load(Ordering::SeqCst);
///         if left == 0 {
///             return Ok(Resolution::Resolved);
///         }
///         self.backlog.store(left - 1, Ordering::SeqCst);
///         Ok(Resolution::retry())
///     }
/// }
/// ```
#[async_trait]
pub trait Solve: Send + Sync + 'static {
    /// Performs one resolution step.
    async fn solve(&self) -> Result<Resolution, SolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_delay_is_immediate_retry() {
        assert_eq!(Resolution::retry_in(Duration::ZERO), Resolution::retry());
        assert_eq!(
            Resolution::retry_in(Duration::from_millis(5)),
            Resolution::Pending {
                retry_in: Some(Duration::from_millis(5))
            }
        );
        assert!(Resolution::Resolved.is_resolved());
        assert!(!Resolution::retry().is_resolved());
    }
}
