//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings shared by every component created
//! from a [`Context`](crate::Context).
//!
//! Config is used in two ways:
//! 1. **Context creation**: `Context::builder(config).build()` sizes the event bus
//! 2. **Component shutdown**: `Resolver::stop` / `DynamicState::stop` bound their wait by [`Config::stop_grace`]
//!
//! ## Sentinel values
//! - `grace = 0s` → `stop()` waits for the worker without a limit

use std::time::Duration;

/// Global configuration for the runtime context.
///
/// ## Field semantics
/// - `grace`: Maximum wait for a resolver worker to exit on `stop()` (`0s` = no limit)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time `stop()` waits for an active worker to observe cancellation.
    ///
    /// A worker only observes cancellation between `solve()` calls or while it
    /// sleeps on a wait hint. When the wait exceeds `grace`:
    /// - the worker task is aborted
    /// - `stop()` returns `RuntimeError::GraceExceeded`
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the shutdown grace period as an `Option`.
    ///
    /// - `None` → wait for the worker without a limit
    /// - `Some(d)` → abort the worker after `d`
    #[inline]
    pub fn stop_grace(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_grace_means_unbounded() {
        let cfg = Config {
            grace: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(cfg.stop_grace(), None);
        assert_eq!(Config::default().stop_grace(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_bus_capacity_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
