//! # Transitions: how a state moves toward its goal.
//!
//! A [`Transitions`] implementation is a pure lookup `(state, goal) → Option<Transition>`.
//! `None` means the goal is reached; there is no other terminal signal.
//!
//! A [`Transition`] is a tagged value:
//! - an **act** run once under the state lock, returning an optional wait hint
//!   - `None` → synchronous, the machine looks up the next transition immediately
//!   - `Some(d)` → asynchronous, the act started background work; look again after `d`
//! - optional **hooks** (`before`, `after`) run in program order on the hook queue,
//!   each receiving a snapshot of `(state, goal)`
//!
//! ## Example
//! ```rust
//! use statevisor::Transition;
//!
//! fn step(state: &u32, goal: &u32) -> Option<Transition<u32, u32>> {
//!     match state.cmp(goal) {
//!         std::cmp::Ordering::Less => Some(Transition::sync(|s: &mut u32, _: &u32| *s += 1)),
//!         std::cmp::Ordering::Greater => Some(Transition::sync(|s: &mut u32, _: &u32| *s -= 1)),
//!         std::cmp::Ordering::Equal => None,
//!     }
//! }
//! assert!(step(&3, &3).is_none());
//! assert!(step(&1, &3).is_some());
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::state::handle::StateHandle;

/// Act of a transition: mutates the state in place and returns an optional wait hint.
pub type Act<S, G> = Box<dyn FnOnce(&mut S, &G, &StateHandle<S, G>) -> Option<Duration> + Send>;

/// Observer fired around an act with a snapshot of `(state, goal)`.
pub type Hook<S, G> = Arc<dyn Fn(&S, &G) + Send + Sync>;

/// Hook pair attached to a transition.
pub struct TransitionHooks<S, G> {
    pub(crate) before: Hook<S, G>,
    pub(crate) after: Hook<S, G>,
}

/// One step toward the goal.
pub struct Transition<S, G> {
    pub(crate) act: Act<S, G>,
    pub(crate) hooks: Option<TransitionHooks<S, G>>,
}

impl<S: 'static, G: 'static> Transition<S, G> {
    /// Creates a transition from a full act.
    ///
    /// The act runs with the state lock held: mutate through `&mut S`, keep it
    /// short, and use the [`StateHandle`] only from background work it spawns
    /// (calling `state()`/`update_state()` from inside the act would deadlock).
    pub fn new<F>(act: F) -> Self
    where
        F: FnOnce(&mut S, &G, &StateHandle<S, G>) -> Option<Duration> + Send + 'static,
    {
        Self {
            act: Box::new(act),
            hooks: None,
        }
    }

    /// Synchronous transition: acts and asks for an immediate re-evaluation.
    pub fn sync<F>(act: F) -> Self
    where
        F: FnOnce(&mut S, &G) + Send + 'static,
    {
        Self::new(move |state: &mut S, goal: &G, _: &StateHandle<S, G>| {
            act(state, goal);
            None
        })
    }

    /// Asynchronous transition: starts work and asks to be re-evaluated after the returned delay.
    pub fn timed<F>(act: F) -> Self
    where
        F: FnOnce(&mut S, &G, &StateHandle<S, G>) -> Duration + Send + 'static,
    {
        Self::new(move |state: &mut S, goal: &G, handle: &StateHandle<S, G>| {
            Some(act(state, goal, handle))
        })
    }

    /// Attaches `before`/`after` hooks.
    pub fn with_hooks<B, A>(mut self, before: B, after: A) -> Self
    where
        B: Fn(&S, &G) + Send + Sync + 'static,
        A: Fn(&S, &G) + Send + Sync + 'static,
    {
        self.hooks = Some(TransitionHooks {
            before: Arc::new(before),
            after: Arc::new(after),
        });
        self
    }
}

impl<S, G> Transition<S, G> {
    /// Returns true if hooks are attached.
    pub fn has_hooks(&self) -> bool {
        self.hooks.is_some()
    }
}

impl<S, G> std::fmt::Debug for Transition<S, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("hooks", &self.has_hooks())
            .finish_non_exhaustive()
    }
}

/// Transition lookup for a [`DynamicState`](crate::DynamicState).
///
/// Must be pure and quick: it runs under the state lock, and also backs
/// [`DynamicState::has_reached_goal`](crate::DynamicState::has_reached_goal).
pub trait Transitions<S, G>: Send + Sync + 'static {
    /// Returns the next step, or `None` if `state` satisfies `goal`.
    fn transition(&self, state: &S, goal: &G) -> Option<Transition<S, G>>;
}

impl<S, G, F> Transitions<S, G> for F
where
    F: Fn(&S, &G) -> Option<Transition<S, G>> + Send + Sync + 'static,
{
    fn transition(&self, state: &S, goal: &G) -> Option<Transition<S, G>> {
        self(state, goal)
    }
}
