//! Goal-directed state machines.
//!
//! - [`DynamicState`]: holds `state` and `goal`, drives a resolver until the goal is reached
//! - [`Transition`] / [`Transitions`]: the rules that move state toward the goal
//! - [`StateHandle`]: cloneable access for background work started by a transition

mod dynamic;
mod handle;
mod transition;

pub use dynamic::DynamicState;
pub use handle::StateHandle;
pub use transition::{Act, Hook, Transition, TransitionHooks, Transitions};
