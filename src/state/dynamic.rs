//! # DynamicState: goal-directed state machine driven by a [`Resolver`].
//!
//! Holds a `state` and a `goal` and keeps applying transitions from a
//! [`Transitions`] lookup until it returns `None`.
//!
//! ## Architecture
//! ```text
//! set_goal(g) ──► goal != g ? ──► goal := g ──► Resolver::report_change()
//!                                                        │
//!                                                        ▼
//! solve() ──► lock(state, goal)
//!              ├─ transitions(state, goal) == None ─► Resolved
//!              └─ Some(transition)
//!                   ├─► hooks? ─► queue before(snapshot)
//!                   ├─► act(&mut state, &goal, handle) ─► wait hint
//!                   ├─► hooks? ─► queue after(snapshot)
//!                   └─► Pending { retry_in: wait hint }
//!
//! hook queue (SequentialQueue): before₁ → after₁ → before₂ → after₂ ...
//! ```
//!
//! ## Rules
//! - Termination is goal-relative: a new goal re-activates a resolved machine
//! - Setting an equal goal never wakes the resolver
//! - Acts run under the state lock; hooks run later, off the lock, in program order
//! - A panicking act is a fault: the machine stops resolving and reports it via [`DynamicState::fault`]

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{RuntimeError, SolveError};
use crate::events::{Event, EventKind};
use crate::resolver::{ChangeSignal, Resolution, Resolver, Solve};
use crate::runtime::{Context, SequentialQueue};
use crate::state::handle::StateHandle;
use crate::state::transition::{Transition, Transitions};

struct Inner<S, G> {
    state: S,
    goal: G,
}

/// Shared part of a state machine; the resolver's `Solve` implementation.
pub(crate) struct Core<S, G> {
    me: Weak<Core<S, G>>,
    name: Arc<str>,
    ctx: Context,
    inner: Mutex<Inner<S, G>>,
    transitions: Box<dyn Transitions<S, G>>,
    hooks: SequentialQueue,
    signal: OnceLock<ChangeSignal>,
}

impl<S, G> Core<S, G> {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S, G>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn report_change(&self) {
        if let Some(signal) = self.signal.get() {
            signal.report_change();
        }
    }
}

impl<S, G> Core<S, G>
where
    S: Clone + Send + 'static,
    G: Clone + PartialEq + Send + 'static,
{
    pub(crate) fn state(&self) -> S {
        self.lock().state.clone()
    }

    pub(crate) fn goal(&self) -> G {
        self.lock().goal.clone()
    }

    pub(crate) fn set_goal(&self, goal: G) -> bool {
        {
            let mut inner = self.lock();
            if inner.goal == goal {
                return false;
            }
            inner.goal = goal;
        }
        self.ctx
            .publish(Event::new(EventKind::GoalChanged).with_source(Arc::clone(&self.name)));
        self.report_change();
        true
    }

    pub(crate) fn update_state<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let out = f(&mut self.lock().state);
        self.report_change();
        out
    }

    pub(crate) fn has_reached_goal(&self) -> bool {
        let inner = self.lock();
        self.transitions
            .transition(&inner.state, &inner.goal)
            .is_none()
    }

    /// Looks up and applies one transition. Returns `None` when the goal is reached.
    fn step(&self, handle: &StateHandle<S, G>) -> Option<Option<Duration>> {
        let mut inner = self.lock();
        let Inner { state, goal } = &mut *inner;
        let Transition { act, hooks } = self.transitions.transition(state, goal)?;

        if let Some(hooks) = &hooks {
            let before = Arc::clone(&hooks.before);
            let (s, g) = (state.clone(), goal.clone());
            self.hooks.submit(move || before(&s, &g));
        }
        let wait = act(state, goal, handle);
        if let Some(hooks) = hooks {
            let after = hooks.after;
            let (s, g) = (state.clone(), goal.clone());
            self.hooks.submit(move || after(&s, &g));
        }
        Some(wait.filter(|d| !d.is_zero()))
    }
}

#[async_trait]
impl<S, G> Solve for Core<S, G>
where
    S: Clone + Send + 'static,
    G: Clone + PartialEq + Send + 'static,
{
    async fn solve(&self) -> Result<Resolution, SolveError> {
        let Some(core) = self.me.upgrade() else {
            return Ok(Resolution::Resolved);
        };
        let handle = StateHandle { core };

        match self.step(&handle) {
            None => Ok(Resolution::Resolved),
            Some(wait) => {
                let mut ev = Event::new(EventKind::TransitionApplied).with_source(Arc::clone(&self.name));
                if let Some(delay) = wait {
                    ev = ev.with_delay(delay);
                }
                self.ctx.publish(ev);
                Ok(Resolution::Pending { retry_in: wait })
            }
        }
    }
}

/// Goal-directed state machine.
///
/// ### Responsibilities
/// - **Goal tracking**: `set_goal` wakes the resolver only when the goal actually changes
/// - **Resolution**: applies transitions until the lookup returns `None`
/// - **Hooks**: runs before/after hooks in order on a dedicated sequential queue
/// - **Reminders**: optionally re-evaluates periodically for conditions nobody reports
///
/// Creating the machine reports an initial change, so it starts driving toward
/// its initial goal right away.
///
/// # Example
/// ```rust
/// use statevisor::{Config, Context, DynamicState, Transition};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let ctx = Context::new(Config::default());
///     let volume = DynamicState::new(&ctx, "volume", 0_u8, 3_u8, |s: &u8, g: &u8| {
///         (s < g).then(|| Transition::sync(|s: &mut u8, _: &u8| *s += 1))
///     });
///
///     volume.block_until_goal_resolved().await;
///     assert_eq!(volume.state(), 3);
///     volume.stop().await.unwrap();
/// }
/// ```
pub struct DynamicState<S, G> {
    core: Arc<Core<S, G>>,
    resolver: Resolver,
    reminder: Mutex<Option<CancellationToken>>,
}

impl<S, G> DynamicState<S, G>
where
    S: Clone + Send + 'static,
    G: Clone + PartialEq + Send + 'static,
{
    /// Creates the machine and starts resolving toward `goal`.
    pub fn new<T>(ctx: &Context, name: impl Into<Arc<str>>, state: S, goal: G, transitions: T) -> Self
    where
        T: Transitions<S, G>,
    {
        let name: Arc<str> = name.into();
        let core = Arc::new_cyclic(|me| Core {
            me: me.clone(),
            name: Arc::clone(&name),
            ctx: ctx.clone(),
            inner: Mutex::new(Inner { state, goal }),
            transitions: Box::new(transitions),
            hooks: SequentialQueue::new(ctx, format!("{name}/hooks")),
            signal: OnceLock::new(),
        });
        let resolver = Resolver::new(ctx, name, Arc::clone(&core) as Arc<dyn Solve>);
        let _ = core.signal.set(resolver.signal());
        resolver.report_change();

        Self {
            core,
            resolver,
            reminder: Mutex::new(None),
        }
    }

    /// Returns the machine name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> S {
        self.core.state()
    }

    /// Returns a snapshot of the current goal.
    pub fn goal(&self) -> G {
        self.core.goal()
    }

    /// Replaces the goal and wakes the resolver if `goal` differs from the current one.
    ///
    /// Returns `true` if the goal changed.
    pub fn set_goal(&self, goal: G) -> bool {
        self.core.set_goal(goal)
    }

    /// Returns true if no transition is required for the current state and goal.
    pub fn has_reached_goal(&self) -> bool {
        self.core.has_reached_goal()
    }

    /// Mutates the state under the lock, then reports a change.
    pub fn update_state<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        self.core.update_state(f)
    }

    /// Reports an external change that may affect the transition lookup.
    pub fn report_change(&self) {
        self.resolver.report_change();
    }

    /// Returns a cloneable handle for background work.
    pub fn handle(&self) -> StateHandle<S, G> {
        StateHandle {
            core: Arc::clone(&self.core),
        }
    }

    /// Waits until the resolver is quiescent (goal reached, or machine stopped).
    pub async fn block_until_goal_resolved(&self) {
        self.resolver.block_until_quiescent().await;
    }

    /// Re-evaluates the machine every `period` until replaced or stopped.
    ///
    /// `Duration::ZERO` clears the reminder.
    pub fn set_reminder(&self, period: Duration) {
        let mut slot = self.reminder.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = slot.take() {
            old.cancel();
        }
        if period.is_zero() || !self.resolver.is_alive() {
            return;
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let signal = self.resolver.signal();
        self.core.ctx.spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        if !signal.is_alive() {
                            break;
                        }
                        signal.report_change();
                    }
                }
            }
        });
        *slot = Some(token);
    }

    /// Returns the fault that stopped the machine, if a transition failed.
    pub fn fault(&self) -> Option<SolveError> {
        self.resolver.fault()
    }

    /// Returns false after `stop()` or a fault.
    pub fn is_alive(&self) -> bool {
        self.resolver.is_alive()
    }

    /// Returns the backing resolver.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Stops resolving, then drains the hook queue.
    ///
    /// Hooks already queued still run, in order; no new ones are accepted.
    /// Calling it again is a no-op.
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        self.cancel_reminder();
        let res = self.resolver.stop().await;
        self.core.hooks.stop().await;
        res
    }
}

impl<S, G> DynamicState<S, G> {
    fn cancel_reminder(&self) {
        let token = self
            .reminder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
        }
    }
}

impl<S, G> Drop for DynamicState<S, G> {
    fn drop(&mut self) {
        self.cancel_reminder();
    }
}

impl<S, G> std::fmt::Debug for DynamicState<S, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicState")
            .field("name", &self.core.name)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    /// Steps an integer toward its goal one unit per synchronous act.
    struct Counter {
        acts: Arc<AtomicUsize>,
    }

    impl Transitions<i64, i64> for Counter {
        fn transition(&self, state: &i64, goal: &i64) -> Option<Transition<i64, i64>> {
            let delta = (goal - state).signum();
            if delta == 0 {
                return None;
            }
            let acts = Arc::clone(&self.acts);
            Some(Transition::sync(move |s: &mut i64, _: &i64| {
                acts.fetch_add(1, Ordering::SeqCst);
                *s += delta;
            }))
        }
    }

    fn counter(ctx: &Context, state: i64, goal: i64) -> (DynamicState<i64, i64>, Arc<AtomicUsize>) {
        let acts = Arc::new(AtomicUsize::new(0));
        let machine = DynamicState::new(
            ctx,
            "counter",
            state,
            goal,
            Counter {
                acts: Arc::clone(&acts),
            },
        );
        (machine, acts)
    }

    #[tokio::test]
    async fn test_synchronous_steps_reach_goal() {
        let ctx = Context::new(Config::default());
        let (machine, acts) = counter(&ctx, 0, 5);

        machine.block_until_goal_resolved().await;
        assert_eq!(machine.state(), 5);
        assert_eq!(acts.load(Ordering::SeqCst), 5);
        assert!(machine.has_reached_goal());
        machine.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_equal_goal_does_not_wake_resolver() {
        let ctx = Context::new(Config::default());
        let (machine, acts) = counter(&ctx, 0, 2);
        machine.block_until_goal_resolved().await;

        let signals = machine.resolver().signals();
        let activations = machine.resolver().activations();
        assert!(!machine.set_goal(2));
        assert_eq!(machine.resolver().signals(), signals);
        assert_eq!(machine.resolver().activations(), activations);

        // A different goal un-terminates the machine.
        assert!(machine.set_goal(-1));
        assert!(!machine.has_reached_goal());
        machine.block_until_goal_resolved().await;
        assert_eq!(machine.state(), -1);
        assert_eq!(acts.load(Ordering::SeqCst), 5);
        assert_eq!(machine.resolver().activations(), activations + 1);
    }

    #[tokio::test]
    async fn test_hooks_run_in_program_order() {
        let ctx = Context::new(Config::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let hook_log = Arc::clone(&log);

        let machine = DynamicState::new(&ctx, "hooked", 0_u32, 2_u32, move |s: &u32, g: &u32| {
            if s >= g {
                return None;
            }
            let before_log = Arc::clone(&hook_log);
            let after_log = Arc::clone(&hook_log);
            Some(
                Transition::sync(|s: &mut u32, _: &u32| *s += 1).with_hooks(
                    move |s: &u32, _: &u32| {
                        before_log
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(format!("before {s}"))
                    },
                    move |s: &u32, _: &u32| {
                        after_log
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(format!("after {s}"))
                    },
                ),
            )
        });

        machine.block_until_goal_resolved().await;
        machine.stop().await.expect("stop");

        let log = log.lock().unwrap_or_else(PoisonError::into_inner).clone();
        assert_eq!(log, vec!["before 0", "after 1", "before 1", "after 2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_transition_waits_for_background_work() {
        let ctx = Context::new(Config::default());
        let acts = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&acts);

        let link = DynamicState::new(&ctx, "link", false, true, move |s: &bool, g: &bool| {
            if s == g {
                return None;
            }
            let counted = Arc::clone(&counted);
            Some(Transition::timed(
                move |_: &mut bool, goal: &bool, handle: &StateHandle<bool, bool>| {
                    counted.fetch_add(1, Ordering::SeqCst);
                    let (handle, target) = (handle.clone(), *goal);
                    tokio::spawn(async move {
                        time::sleep(Duration::from_millis(30)).await;
                        handle.update_state(|s| *s = target);
                    });
                    Duration::from_millis(100)
                },
            ))
        });

        settle().await;
        assert_eq!(acts.load(Ordering::SeqCst), 1);
        assert!(!link.state());

        time::advance(Duration::from_millis(31)).await;
        settle().await;
        assert!(link.state());
        assert!(!link.resolver().is_quiescent(), "worker still sleeping on its wait hint");

        time::advance(Duration::from_millis(70)).await;
        settle().await;
        assert!(link.resolver().is_quiescent());
        assert_eq!(acts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_picks_up_unreported_conditions() {
        let ctx = Context::new(Config::default());
        let link_up = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&link_up);

        let session = DynamicState::new(&ctx, "session", false, true, move |s: &bool, g: &bool| {
            // Nothing can be done while the link is down.
            (s != g && observed.load(Ordering::SeqCst))
                .then(|| Transition::sync(|s: &mut bool, g: &bool| *s = *g))
        });
        session.block_until_goal_resolved().await;
        assert!(!session.state());

        link_up.store(true, Ordering::SeqCst);
        session.set_reminder(Duration::from_millis(10));
        settle().await;
        assert!(!session.state());

        time::advance(Duration::from_millis(11)).await;
        settle().await;
        assert!(session.state());
        session.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn test_panicking_act_faults_machine() {
        let ctx = Context::new(Config::default());
        let machine = DynamicState::new(&ctx, "broken", 0_u8, 1_u8, |s: &u8, g: &u8| {
            (s != g).then(|| Transition::sync(|_: &mut u8, _: &u8| panic!("act exploded")))
        });

        machine.block_until_goal_resolved().await;
        assert!(!machine.is_alive());
        assert_eq!(
            machine.fault(),
            Some(SolveError::Panicked {
                info: "act exploded".into()
            })
        );
        // The poisoned lock is still readable.
        assert_eq!(machine.state(), 0);
    }

    #[tokio::test]
    async fn test_stop_twice_is_harmless() {
        let ctx = Context::new(Config::default());
        let (machine, _) = counter(&ctx, 0, 3);
        machine.stop().await.expect("first stop");
        machine.stop().await.expect("second stop");
        assert!(!machine.set_goal(3));
        assert!(machine.set_goal(10));
        machine.block_until_goal_resolved().await;
        assert_ne!(machine.state(), 10);
    }

    #[tokio::test]
    async fn test_handle_updates_wake_machine() {
        let ctx = Context::new(Config::default());
        let (machine, acts) = counter(&ctx, 0, 0);
        machine.block_until_goal_resolved().await;

        let handle = machine.handle();
        handle.update_state(|s| *s = 4);
        machine.block_until_goal_resolved().await;
        assert_eq!(handle.state(), 0);
        assert_eq!(acts.load(Ordering::SeqCst), 4);
    }
}
