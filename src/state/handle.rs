//! # Shared handle to a running state machine.
//!
//! [`StateHandle`] is what a transition act receives and what background work
//! keeps after the act returns. It reads and updates the machine without
//! owning its lifecycle: stopping the [`DynamicState`](crate::DynamicState)
//! turns `report_change` into a no-op.

use std::sync::Arc;

use crate::state::dynamic::Core;

/// Cloneable handle to a [`DynamicState`](crate::DynamicState).
pub struct StateHandle<S, G> {
    pub(crate) core: Arc<Core<S, G>>,
}

impl<S, G> Clone for StateHandle<S, G> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<S, G> StateHandle<S, G>
where
    S: Clone + Send + 'static,
    G: Clone + PartialEq + Send + 'static,
{
    /// Returns a snapshot of the current state.
    pub fn state(&self) -> S {
        self.core.state()
    }

    /// Returns a snapshot of the current goal.
    pub fn goal(&self) -> G {
        self.core.goal()
    }

    /// Replaces the goal if it differs. Returns `true` if it changed.
    pub fn set_goal(&self, goal: G) -> bool {
        self.core.set_goal(goal)
    }

    /// Mutates the state under the lock, then reports a change.
    ///
    /// This is how background work started by an asynchronous act publishes its result.
    pub fn update_state<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        self.core.update_state(f)
    }

    /// Reports an external change without touching the state.
    pub fn report_change(&self) {
        self.core.report_change();
    }

    /// Returns true if no transition is required for the current state and goal.
    pub fn has_reached_goal(&self) -> bool {
        self.core.has_reached_goal()
    }
}

impl<S, G> std::fmt::Debug for StateHandle<S, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateHandle")
            .field("name", &self.core.name())
            .finish_non_exhaustive()
    }
}
