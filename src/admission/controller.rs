//! # AdmissionController: bounded, prioritized activity admission.
//!
//! Callers ask to run a named activity and wait until the policy admits it.
//!
//! ## Architecture
//! ```text
//! request_to_execute(a) ──► lock(state)
//!                             ├─ closed? ─► Err
//!                             └─ pending.insert((-priority(a), seq), waiter)
//!                       ──► admission pass
//!                       ◄── oneshot: Ok | Err
//!
//! activity_ended(a) ──► lock(state)
//!                         ├─ running[a] == 0 ─► ActivityMismatch, Err(NotRunning)
//!                         └─ running[a] -= 1
//!                   ──► on_end(a, snapshot)
//!                   ──► admission pass (may admit several)
//!
//! admission pass, one admission per step:
//!   lock(state)
//!     ├─ total == max_concurrency ─► done
//!     └─ first waiter in order (priority desc, arrival asc) with can_admit
//!          ├─ none ─► done
//!          └─ running[a] += 1
//!   on_begin(a, snapshot) ─► wake waiter ─► next step
//! ```
//!
//! ## Rules
//! - Total running never exceeds `max_concurrency()` (`0` = unlimited)
//! - A waiter with strictly higher priority is never overtaken by a lower one
//!   that is admissible at the same time; equal priorities are FIFO
//! - Dropping a `request_to_execute` future withdraws the request, or releases
//!   the slot if it had already been granted
//! - A panic in policy code closes the controller; every waiter gets `PolicyFault`

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::admission::counts::RunningCounts;
use crate::admission::error::ControllerError;
use crate::admission::permit::ActivityPermit;
use crate::admission::policy::AdmissionPolicy;
use crate::error::panic_info;
use crate::events::{Event, EventKind};
use crate::runtime::Context;

type Key = (Reverse<i32>, u64);
type Grant = Result<(), ControllerError>;

struct Waiter {
    activity: Arc<str>,
    priority: i32,
    tx: oneshot::Sender<Grant>,
}

#[derive(Default)]
struct State {
    running: RunningCounts,
    pending: BTreeMap<Key, Waiter>,
    next_seq: u64,
    closed: Option<ControllerError>,
}

struct Shared {
    name: Arc<str>,
    ctx: Context,
    policy: Arc<dyn AdmissionPolicy>,
    state: Mutex<State>,
}

/// Runs policy code, turning a panic into its message.
fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_info(&*payload))
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_source(Arc::clone(&self.name))
    }

    /// Picks the first admissible waiter in queue order and counts it as running.
    ///
    /// Returns the waiter with the counts after its admission, or `None` if the
    /// cap is reached or nothing is admissible.
    fn next_admissible(&self, st: &mut State) -> Result<Option<(Waiter, RunningCounts)>, String> {
        if st.closed.is_some() || st.pending.is_empty() {
            return Ok(None);
        }
        let max = guarded(|| self.policy.max_concurrency())?;
        if max != 0 && st.running.total() >= max {
            return Ok(None);
        }

        let mut withdrawn = Vec::new();
        let mut found = None;
        for (key, waiter) in &st.pending {
            if waiter.tx.is_closed() {
                withdrawn.push(*key);
                continue;
            }
            if guarded(|| self.policy.can_admit(&waiter.activity, &st.running))? {
                found = Some(*key);
                break;
            }
        }
        for key in withdrawn {
            st.pending.remove(&key);
        }

        let Some(waiter) = found.and_then(|key| st.pending.remove(&key)) else {
            return Ok(None);
        };
        st.running.increment(&waiter.activity);
        Ok(Some((waiter, st.running.clone())))
    }

    /// Admits waiters one at a time until nothing more is admissible.
    ///
    /// `on_begin` for each admission returns before the next waiter is evaluated.
    fn admit(&self) {
        loop {
            let (waiter, snapshot) = {
                let mut st = self.lock();
                match self.next_admissible(&mut st) {
                    Ok(Some(next)) => next,
                    Ok(None) => return,
                    Err(reason) => {
                        self.fault_locked(&mut st, reason);
                        return;
                    }
                }
            };

            if let Err(reason) = guarded(|| self.policy.on_begin(&waiter.activity, &snapshot)) {
                let mut st = self.lock();
                st.running.decrement(&waiter.activity);
                let err = self.fault_locked(&mut st, reason);
                let _ = waiter.tx.send(Err(err));
                return;
            }
            self.ctx.publish(
                self.event(EventKind::ActivityAdmitted)
                    .with_activity(Arc::clone(&waiter.activity))
                    .with_priority(waiter.priority)
                    .with_running(snapshot.get(&waiter.activity)),
            );
            if waiter.tx.send(Ok(())).is_err() {
                // Withdrawn while on_begin ran.
                let _ = self.finish(&waiter.activity);
            }
        }
    }

    /// Closes the controller with a policy fault and fails every waiter.
    fn fault_locked(&self, st: &mut State, reason: String) -> ControllerError {
        if let Some(err @ ControllerError::PolicyFault { .. }) = &st.closed {
            return err.clone();
        }
        let err = ControllerError::PolicyFault {
            reason: reason.clone(),
        };
        st.closed = Some(err.clone());
        for (_, waiter) in std::mem::take(&mut st.pending) {
            let _ = waiter.tx.send(Err(err.clone()));
        }
        self.ctx
            .publish(self.event(EventKind::ControllerFaulted).with_reason(reason));
        err
    }

    /// Decrements `activity` and calls `on_end` outside the lock. Admits nothing.
    fn finish(&self, activity: &str) -> Result<(), ControllerError> {
        let snapshot = {
            let mut st = self.lock();
            let Some(left) = st.running.decrement(activity) else {
                drop(st);
                self.ctx
                    .publish(self.event(EventKind::ActivityMismatch).with_activity(activity));
                return Err(ControllerError::NotRunning {
                    activity: activity.to_string(),
                });
            };
            self.ctx.publish(
                self.event(EventKind::ActivityEnded)
                    .with_activity(activity)
                    .with_running(left),
            );
            st.running.clone()
        };
        guarded(|| self.policy.on_end(activity, &snapshot)).map_err(|reason| {
            let mut st = self.lock();
            self.fault_locked(&mut st, reason)
        })
    }
}

/// Pending request; withdraws itself if dropped before completion.
struct Waiting<'a> {
    shared: &'a Shared,
    key: Key,
    activity: Arc<str>,
    rx: oneshot::Receiver<Grant>,
    done: bool,
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let granted = {
            let mut st = self.shared.lock();
            if st.pending.remove(&self.key).is_some() {
                return;
            }
            matches!(self.rx.try_recv(), Ok(Ok(())))
        };
        if granted {
            // Admitted but never observed: end it and hand the slot on.
            let _ = self.shared.finish(&self.activity);
            self.shared.admit();
        }
    }
}

/// Bounded, prioritized admission of named activities.
///
/// Cloning is cheap; clones share the same queue and counts.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use statevisor::{AdmissionController, Config, Context, MaxActivities};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let ctx = Context::new(Config::default());
///     let ctrl = AdmissionController::new(&ctx, "uploads", Arc::new(MaxActivities(2)));
///
///     ctrl.request_to_execute("upload").await.unwrap();
///     assert_eq!(ctrl.running("upload"), 1);
///     ctrl.activity_ended("upload").unwrap();
///
///     let sum = ctrl.execute("sum", async { 1 + 2 }).await.unwrap();
///     assert_eq!(sum, 3);
///     assert_eq!(ctrl.running_total(), 0);
/// }
/// ```
#[derive(Clone)]
pub struct AdmissionController {
    shared: Arc<Shared>,
}

impl AdmissionController {
    /// Creates a controller governed by `policy`.
    pub fn new(ctx: &Context, name: impl Into<Arc<str>>, policy: Arc<dyn AdmissionPolicy>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                ctx: ctx.clone(),
                policy,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Returns the controller name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Waits until `activity` is admitted.
    ///
    /// On success the activity counts as running until [`activity_ended`](Self::activity_ended)
    /// is called for it. Cancel-safe.
    pub async fn request_to_execute(&self, activity: &str) -> Result<(), ControllerError> {
        let shared = &*self.shared;
        let activity: Arc<str> = Arc::from(activity);
        let (tx, rx) = oneshot::channel();

        let key = {
            let mut st = shared.lock();
            if let Some(err) = &st.closed {
                return Err(err.clone());
            }
            let priority = match guarded(|| shared.policy.priority(&activity)) {
                Ok(p) => p,
                Err(reason) => return Err(shared.fault_locked(&mut st, reason)),
            };
            let key = (Reverse(priority), st.next_seq);
            st.next_seq += 1;
            st.pending.insert(
                key,
                Waiter {
                    activity: Arc::clone(&activity),
                    priority,
                    tx,
                },
            );
            shared.ctx.publish(
                shared
                    .event(EventKind::ActivityQueued)
                    .with_activity(Arc::clone(&activity))
                    .with_priority(priority),
            );
            key
        };

        let mut waiting = Waiting {
            shared,
            key,
            activity,
            rx,
            done: false,
        };
        shared.admit();
        let grant = (&mut waiting.rx).await;
        waiting.done = true;

        match grant {
            Ok(res) => res,
            Err(_) => Err(ControllerError::Closed),
        }
    }

    /// Marks one running instance of `activity` as ended, calls `on_end`, then admits waiters.
    ///
    /// Still accepted after [`stop`](Self::stop), so running work can wind down.
    pub fn activity_ended(&self, activity: &str) -> Result<(), ControllerError> {
        self.shared.finish(activity)?;
        self.shared.admit();
        Ok(())
    }

    /// Waits for admission and returns a permit that ends the activity on drop.
    pub async fn acquire(&self, activity: &str) -> Result<ActivityPermit, ControllerError> {
        self.request_to_execute(activity).await?;
        Ok(ActivityPermit::new(self.clone(), Arc::from(activity)))
    }

    /// Runs `fut` as `activity`, admitted and ended around it.
    pub async fn execute<F>(&self, activity: &str, fut: F) -> Result<F::Output, ControllerError>
    where
        F: Future,
    {
        let permit = self.acquire(activity).await?;
        let out = fut.await;
        permit.release()?;
        Ok(out)
    }

    /// Returns the running count of `activity`.
    pub fn running(&self, activity: &str) -> usize {
        self.shared.lock().running.get(activity)
    }

    /// Returns the total number of running activities.
    pub fn running_total(&self) -> usize {
        self.shared.lock().running.total()
    }

    /// Returns a snapshot of the running counts.
    pub fn running_counts(&self) -> RunningCounts {
        self.shared.lock().running.clone()
    }

    /// Returns the number of waiting requests.
    pub fn pending_len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Returns true after [`stop`](Self::stop) or a policy fault.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed.is_some()
    }

    /// Closes the controller: waiters get [`ControllerError::Closed`], new requests are refused.
    ///
    /// Calling it again (or after a fault) is a no-op.
    pub fn stop(&self) {
        let shared = &*self.shared;
        let mut st = shared.lock();
        if st.closed.is_some() {
            return;
        }
        st.closed = Some(ControllerError::Closed);
        for (_, waiter) in std::mem::take(&mut st.pending) {
            let _ = waiter.tx.send(Err(ControllerError::Closed));
        }
        drop(st);
        shared
            .ctx
            .publish(shared.event(EventKind::ControllerStopped));
    }
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.shared.lock();
        f.debug_struct("AdmissionController")
            .field("name", &self.shared.name)
            .field("running", &st.running.total())
            .field("pending", &st.pending.len())
            .field("closed", &st.closed.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{ActivityLimits, MaxActivities};
    use crate::Config;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::task::JoinHandle;

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn controller(policy: impl AdmissionPolicy) -> (Context, AdmissionController) {
        let ctx = Context::new(Config::default());
        let ctrl = AdmissionController::new(&ctx, "test", Arc::new(policy));
        (ctx, ctrl)
    }

    /// Requests `activity` in the background and records it in `log` once admitted.
    fn request(
        ctrl: &AdmissionController,
        activity: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> JoinHandle<Result<(), ControllerError>> {
        let (ctrl, log) = (ctrl.clone(), Arc::clone(log));
        tokio::spawn(async move {
            ctrl.request_to_execute(activity).await?;
            log.lock().unwrap_or_else(PoisonError::into_inner).push(activity);
            Ok(())
        })
    }

    fn admitted(log: &Arc<Mutex<Vec<&'static str>>>) -> Vec<&'static str> {
        log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[tokio::test]
    async fn test_third_request_waits_for_an_end() {
        let (_ctx, ctrl) = controller(MaxActivities(2));
        let log = Arc::new(Mutex::new(Vec::new()));

        ctrl.request_to_execute("a").await.expect("a admitted");
        ctrl.request_to_execute("b").await.expect("b admitted");
        let third = request(&ctrl, "c", &log);
        settle().await;
        assert!(!third.is_finished());
        assert_eq!(ctrl.pending_len(), 1);
        assert_eq!(ctrl.running_total(), 2);

        ctrl.activity_ended("a").expect("a was running");
        third.await.expect("join").expect("c admitted");
        assert_eq!(ctrl.running_total(), 2);
        assert_eq!(ctrl.running("c"), 1);
        assert_eq!(ctrl.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_higher_priority_is_admitted_first() {
        let limits = ActivityLimits::new(1)
            .with_priority("low", 1)
            .with_priority("high", 5);
        let (_ctx, ctrl) = controller(limits);
        let log = Arc::new(Mutex::new(Vec::new()));

        ctrl.request_to_execute("holder").await.expect("holder");
        let low = request(&ctrl, "low", &log);
        settle().await;
        let high = request(&ctrl, "high", &log);
        settle().await;
        assert_eq!(ctrl.pending_len(), 2);

        ctrl.activity_ended("holder").expect("holder running");
        high.await.expect("join").expect("high admitted");
        assert_eq!(admitted(&log), vec!["high"]);
        assert!(!low.is_finished());

        ctrl.activity_ended("high").expect("high running");
        low.await.expect("join").expect("low admitted");
        assert_eq!(admitted(&log), vec!["high", "low"]);
    }

    #[tokio::test]
    async fn test_equal_priority_is_fifo() {
        let (_ctx, ctrl) = controller(MaxActivities(1));
        let log = Arc::new(Mutex::new(Vec::new()));

        ctrl.request_to_execute("holder").await.expect("holder");
        let waiters: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|name| request(&ctrl, name, &log))
            .collect();
        settle().await;

        let mut ended = "holder";
        for expected in ["a", "b", "c"] {
            ctrl.activity_ended(ended).expect("running");
            settle().await;
            assert_eq!(admitted(&log).last(), Some(&expected));
            ended = expected;
        }
        for w in waiters {
            w.await.expect("join").expect("admitted");
        }
    }

    #[tokio::test]
    async fn test_per_activity_cap_skips_to_admissible_requests() {
        let (_ctx, ctrl) = controller(ActivityLimits::new(0).with_max("db", 1));
        let log = Arc::new(Mutex::new(Vec::new()));

        ctrl.request_to_execute("db").await.expect("first db");
        let second_db = request(&ctrl, "db", &log);
        settle().await;

        // Queued behind the blocked db request, but admissible.
        ctrl.request_to_execute("cpu").await.expect("cpu");
        assert!(!second_db.is_finished());
        assert_eq!(ctrl.running_total(), 2);

        ctrl.activity_ended("db").expect("db running");
        second_db.await.expect("join").expect("second db");
        assert_eq!(ctrl.running("db"), 1);
    }

    #[tokio::test]
    async fn test_ending_idle_activity_is_a_mismatch() {
        let (ctx, ctrl) = controller(MaxActivities(1));
        let mut rx = ctx.subscribe();

        let err = ctrl.activity_ended("ghost").expect_err("not running");
        assert_eq!(
            err,
            ControllerError::NotRunning {
                activity: "ghost".into()
            }
        );

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::ActivityMismatch);
        assert_eq!(ev.activity.as_deref(), Some("ghost"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_request_is_withdrawn() {
        let (_ctx, ctrl) = controller(MaxActivities(1));
        ctrl.request_to_execute("holder").await.expect("holder");

        let res = tokio::time::timeout(Duration::from_millis(10), ctrl.request_to_execute("late")).await;
        assert!(res.is_err(), "request must still be waiting");
        assert_eq!(ctrl.pending_len(), 0);

        ctrl.activity_ended("holder").expect("holder running");
        assert_eq!(ctrl.running_total(), 0);
    }

    #[tokio::test]
    async fn test_permit_ends_activity_on_drop() {
        let (_ctx, ctrl) = controller(MaxActivities(1));
        {
            let permit = ctrl.acquire("job").await.expect("permit");
            assert_eq!(permit.activity(), "job");
            assert_eq!(ctrl.running("job"), 1);
        }
        assert_eq!(ctrl.running_total(), 0);

        let out = ctrl
            .execute("job", async { "done" })
            .await
            .expect("execute");
        assert_eq!(out, "done");
        assert_eq!(ctrl.running_total(), 0);
    }

    #[tokio::test]
    async fn test_same_activity_counts_against_the_cap() {
        let (_ctx, ctrl) = controller(MaxActivities(2));
        let log = Arc::new(Mutex::new(Vec::new()));

        let waiters: Vec<_> = (0..3).map(|_| request(&ctrl, "x", &log)).collect();
        settle().await;
        assert_eq!(ctrl.running("x"), 2);
        assert_eq!(ctrl.pending_len(), 1);
        assert_eq!(admitted(&log).len(), 2);

        ctrl.activity_ended("x").expect("x running");
        settle().await;
        assert_eq!(ctrl.running("x"), 2);
        assert_eq!(ctrl.pending_len(), 0);
        for w in waiters {
            w.await.expect("join").expect("admitted");
        }
    }

    /// Admits `b` only once the policy has been told that `a` ended.
    #[derive(Default)]
    struct AfterA {
        a_ended: AtomicBool,
    }

    impl AdmissionPolicy for AfterA {
        fn max_concurrency(&self) -> usize {
            0
        }

        fn can_admit(&self, activity: &str, _running: &RunningCounts) -> bool {
            activity != "b" || self.a_ended.load(Ordering::SeqCst)
        }

        fn on_end(&self, activity: &str, _running: &RunningCounts) {
            if activity == "a" {
                self.a_ended.store(true, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn test_on_end_runs_before_waiters_are_reconsidered() {
        let (_ctx, ctrl) = controller(AfterA::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        ctrl.request_to_execute("a").await.expect("a admitted");
        let b = request(&ctrl, "b", &log);
        settle().await;
        assert!(!b.is_finished());

        ctrl.activity_ended("a").expect("a running");
        tokio::time::timeout(Duration::from_secs(1), b)
            .await
            .expect("b must be admitted once a ended")
            .expect("join")
            .expect("b admitted");
        assert_eq!(ctrl.running("b"), 1);
    }

    /// Lets one activity run at a time, tracked through `on_begin`/`on_end` only.
    #[derive(Default)]
    struct OneAtATime {
        busy: AtomicBool,
    }

    impl AdmissionPolicy for OneAtATime {
        fn max_concurrency(&self) -> usize {
            0
        }

        fn can_admit(&self, _activity: &str, _running: &RunningCounts) -> bool {
            !self.busy.load(Ordering::SeqCst)
        }

        fn on_begin(&self, _activity: &str, _running: &RunningCounts) {
            self.busy.store(true, Ordering::SeqCst);
        }

        fn on_end(&self, _activity: &str, _running: &RunningCounts) {
            self.busy.store(false, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_on_begin_runs_before_next_waiter_is_evaluated() {
        let (_ctx, ctrl) = controller(OneAtATime::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        ctrl.request_to_execute("x").await.expect("x admitted");
        let _y = request(&ctrl, "y", &log);
        let _z = request(&ctrl, "z", &log);
        settle().await;
        assert_eq!(ctrl.pending_len(), 2);

        ctrl.activity_ended("x").expect("x running");
        settle().await;
        assert_eq!(admitted(&log), vec!["y"]);
        assert_eq!(ctrl.running_total(), 1);
        assert_eq!(ctrl.pending_len(), 1);
    }

    #[tokio::test]
    async fn test_granted_but_dropped_request_frees_its_slot() {
        let (_ctx, ctrl) = controller(MaxActivities(1));
        let log = Arc::new(Mutex::new(Vec::new()));
        ctrl.request_to_execute("holder").await.expect("holder");

        let mut early = Box::pin(ctrl.request_to_execute("early"));
        assert!(futures::poll!(&mut early).is_pending());
        let next = request(&ctrl, "next", &log);
        settle().await;
        assert_eq!(ctrl.pending_len(), 2);

        // The grant goes to `early`, which is never polled again.
        ctrl.activity_ended("holder").expect("holder running");
        assert_eq!(ctrl.running("early"), 1);
        drop(early);
        assert_eq!(ctrl.running("early"), 0);

        next.await.expect("join").expect("next admitted");
        assert_eq!(ctrl.running_total(), 1);
        ctrl.activity_ended("next").expect("next running");
        assert_eq!(ctrl.running_total(), 0);
    }

    struct Explosive;

    impl AdmissionPolicy for Explosive {
        fn max_concurrency(&self) -> usize {
            0
        }

        fn can_admit(&self, activity: &str, _running: &RunningCounts) -> bool {
            match activity {
                "boom" => panic!("cannot admit boom"),
                "blocked" => false,
                _ => true,
            }
        }
    }

    #[tokio::test]
    async fn test_policy_panic_faults_controller() {
        let (ctx, ctrl) = controller(Explosive);
        let mut rx = ctx.subscribe();
        let log = Arc::new(Mutex::new(Vec::new()));

        let blocked = request(&ctrl, "blocked", &log);
        settle().await;
        assert_eq!(ctrl.pending_len(), 1);

        let fault = ControllerError::PolicyFault {
            reason: "cannot admit boom".into(),
        };
        assert_eq!(ctrl.request_to_execute("boom").await, Err(fault.clone()));
        assert_eq!(blocked.await.expect("join"), Err(fault.clone()));
        assert_eq!(ctrl.request_to_execute("fine").await, Err(fault));
        assert!(ctrl.is_closed());

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::ControllerFaulted));
    }

    #[tokio::test]
    async fn test_stop_fails_waiters_and_is_idempotent() {
        let (_ctx, ctrl) = controller(MaxActivities(1));
        let log = Arc::new(Mutex::new(Vec::new()));

        ctrl.request_to_execute("running").await.expect("running");
        let waiter = request(&ctrl, "waiter", &log);
        settle().await;

        ctrl.stop();
        ctrl.stop();
        assert_eq!(waiter.await.expect("join"), Err(ControllerError::Closed));
        assert_eq!(
            ctrl.request_to_execute("late").await,
            Err(ControllerError::Closed)
        );

        // Running work can still wind down.
        ctrl.activity_ended("running").expect("running");
        assert_eq!(ctrl.running_total(), 0);
        assert!(admitted(&log).is_empty());
    }
}
