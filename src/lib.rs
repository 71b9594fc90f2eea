//! # statevisor
//!
//! **Statevisor** is a small runtime for goal-directed state machines and
//! bounded activity admission on top of tokio.
//!
//! It provides three primitives: a coalescing [`Resolver`] that re-runs a
//! `solve()` callback until it reports resolved, a [`DynamicState`] machine that
//! drives a state toward a goal one transition at a time, and an
//! [`AdmissionController`] that admits named activities under a policy.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌────────────────┐   ┌────────────────┐   ┌──────────────────────┐
//!  │ DynamicState   │   │ Resolver       │   │ AdmissionController  │
//!  │ (state, goal)  │──►│ (single worker │   │ (pending queue,      │
//!  │ + hook queue   │   │  per resolver) │   │  running counts)     │
//!  └───────┬────────┘   └───────┬────────┘   └──────────┬───────────┘
//!          │ Publishes          │ Publishes             │ Publishes
//!          │ - GoalChanged      │ - ResolverActivated   │ - ActivityQueued
//!          │ - TransitionApplied│ - SolveDeferred       │ - ActivityAdmitted
//!          │ - HookPanicked     │ - ResolverFaulted     │ - ActivityEnded
//!          ▼                    ▼                       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                Context (executor handle + Bus)                    │
//! │                 (capacity: Config::bus_capacity)                  │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                            (per-sub queues)
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      sub1.on   sub2.on   subN.on
//!                      _event()  _event()  _event()
//! ```
//!
//! ### Resolution
//! ```text
//! report_change() ──► worker running? ──► yes: mark pending
//!                                    └──► no:  spawn worker
//! worker:
//! loop {
//!   ├─► solve()
//!   │     ├─ Pending{retry_in}  ─► sleep(retry_in) (cancellable), continue
//!   │     ├─ Err / panic        ─► ResolverFaulted, stop
//!   │     └─ Resolved           ─► pending? continue : retire (quiescent)
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Resolution**    | Coalescing single-worker re-evaluation.                      | [`Resolver`], [`Solve`], [`SolveFn`]        |
//! | **State machines**| Goal-directed transitions with ordered hooks.                | [`DynamicState`], [`Transition`]            |
//! | **Admission**     | Prioritized, capped admission of named activities.           | [`AdmissionController`], [`AdmissionPolicy`]|
//! | **Subscriber API**| Hook into runtime events (logging, metrics, custom).         | [`Subscribe`]                               |
//! | **Errors**        | Typed errors for faults, misuse and shutdown.                | [`SolveError`], [`ControllerError`]         |
//! | **Configuration** | Centralize runtime settings.                                 | [`Config`], [`Context`]                     |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use statevisor::{Config, Context, DynamicState, Transition};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum Door { Closed, Open }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn statevisor::Subscribe>> = vec![Arc::new(statevisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn statevisor::Subscribe>> = Vec::new();
//!
//!     let ctx = Context::builder(Config::default()).with_subscribers(subs).build();
//!
//!     let door = DynamicState::new(&ctx, "door", Door::Closed, Door::Open, |s: &Door, g: &Door| {
//!         (s != g).then(|| Transition::sync(|s: &mut Door, g: &Door| *s = g.clone()))
//!     });
//!
//!     door.block_until_goal_resolved().await;
//!     assert_eq!(door.state(), Door::Open);
//!     door.stop().await?;
//!     Ok(())
//! }
//! ```
mod admission;
mod config;
mod error;
mod events;
mod resolver;
mod runtime;
mod state;
mod subscribers;

// ---- Public re-exports ----

pub use admission::{
    ActivityLimits, ActivityPermit, AdmissionController, AdmissionPolicy, ControllerError,
    MaxActivities, RunningCounts,
};
pub use config::Config;
pub use error::{RuntimeError, SolveError};
pub use events::{Bus, Event, EventKind};
pub use resolver::{ChangeSignal, Resolution, Resolver, Solve, SolveFn};
pub use runtime::{Context, ContextBuilder, SequentialQueue};
pub use state::{Act, DynamicState, Hook, StateHandle, Transition, TransitionHooks, Transitions};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
