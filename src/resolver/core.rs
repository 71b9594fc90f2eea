//! # Resolver: coalescing single-worker state resolution.
//!
//! A [`Resolver`] wraps a [`Solve`] callback and guarantees that **at most one**
//! worker task is ever running `solve()` for it, however many threads report
//! changes concurrently.
//!
//! ## Architecture
//! ```text
//! report_change() ──► lock(flags)
//!                       ├─ gate := closed, pending := true
//!                       └─ if !active ─► active := true, pending := false
//!                                        ctx.spawn(worker)
//!
//! worker:
//! loop {
//!   ├─► stop requested?            ─► exit
//!   ├─► solve()
//!   │     ├─ Pending{None}         ─► yield, continue
//!   │     ├─ Pending{Some(d)}      ─► sleep(d) (cancellable), continue
//!   │     ├─ Err / panic           ─► record fault, cancel, exit
//!   │     └─ Resolved ─► lock(flags)
//!   │                     ├─ pending ─► pending := false, continue
//!   │                     └─ else    ─► active := false, gate := open, exit
//! }
//! ```
//!
//! ## Rules
//! - **Single worker**: `active` is only set under the flags lock while it is false
//! - **No lost signal**: a change reported during `solve()` leaves `pending` set,
//!   and the worker checks-and-clears it under the same lock before retiring
//! - **Coalescing**: any number of changes during one `solve()` cost one more `solve()`
//! - **Faults are fatal**: a failing or panicking `solve()` stops the resolver

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::{RuntimeError, SolveError, panic_info};
use crate::events::{Event, EventKind};
use crate::resolver::solve::{Resolution, Solve};
use crate::runtime::Context;

/// Worker bookkeeping, guarded by one mutex.
#[derive(Default)]
struct Flags {
    /// A change arrived that no `solve()` has observed yet.
    pending: bool,
    /// A worker task is looping.
    active: bool,
    /// Handle of the active worker.
    worker: Option<JoinHandle<()>>,
    /// Fault that stopped the resolver.
    fault: Option<SolveError>,
}

struct Shared {
    name: Arc<str>,
    ctx: Context,
    solver: Arc<dyn Solve>,
    flags: Mutex<Flags>,
    /// `true` = quiescent.
    gate: watch::Sender<bool>,
    alive: CancellationToken,
    signals: AtomicU64,
    activations: AtomicU64,
    stop_reported: AtomicBool,
}

impl Shared {
    fn flags(&self) -> MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report_change(self: &Arc<Self>) {
        if self.alive.is_cancelled() {
            return;
        }
        let mut flags = self.flags();
        // stop() cancels before taking the lock, so this check under the lock
        // guarantees no worker is spawned after stop() collected the handle.
        if self.alive.is_cancelled() {
            return;
        }
        self.signals.fetch_add(1, Ordering::Relaxed);
        self.gate.send_replace(false);
        flags.pending = true;

        if !flags.active {
            flags.active = true;
            flags.pending = false;
            self.activations.fetch_add(1, Ordering::Relaxed);
            flags.worker = Some(self.ctx.spawn(Arc::clone(self).run()));
            drop(flags);
            self.ctx
                .publish(Event::new(EventKind::ResolverActivated).with_source(Arc::clone(&self.name)));
        }
    }

    async fn run(self: Arc<Self>) {
        loop {
            if self.alive.is_cancelled() {
                break;
            }
            match self.solve_once().await {
                Ok(Resolution::Resolved) => {
                    if self.try_retire() {
                        return;
                    }
                }
                Ok(Resolution::Pending { retry_in: None }) => {
                    tokio::task::yield_now().await;
                }
                Ok(Resolution::Pending {
                    retry_in: Some(delay),
                }) => {
                    self.ctx.publish(
                        Event::new(EventKind::SolveDeferred)
                            .with_source(Arc::clone(&self.name))
                            .with_delay(delay),
                    );
                    tokio::select! {
                        _ = time::sleep(delay) => {}
                        _ = self.alive.cancelled() => break,
                    }
                }
                Err(fault) => {
                    self.record_fault(fault);
                    break;
                }
            }
        }
        self.retire_stopped();
    }

    async fn solve_once(&self) -> Result<Resolution, SolveError> {
        match AssertUnwindSafe(self.solver.solve()).catch_unwind().await {
            Ok(res) => res,
            Err(payload) => Err(SolveError::Panicked {
                info: panic_info(&*payload),
            }),
        }
    }

    /// Retires the worker unless a change arrived during the last `solve()`.
    fn try_retire(&self) -> bool {
        let mut flags = self.flags();
        if flags.pending && !self.alive.is_cancelled() {
            flags.pending = false;
            return false;
        }
        flags.pending = false;
        flags.active = false;
        flags.worker = None;
        self.gate.send_replace(true);
        drop(flags);

        self.ctx
            .publish(Event::new(EventKind::ResolverIdle).with_source(Arc::clone(&self.name)));
        true
    }

    /// Retires the worker after cancellation, dropping any pending change.
    fn retire_stopped(&self) {
        let mut flags = self.flags();
        flags.pending = false;
        flags.active = false;
        flags.worker = None;
        self.gate.send_replace(true);
    }

    fn grace_exceeded(&self, grace: Duration) -> RuntimeError {
        RuntimeError::GraceExceeded {
            name: self.name.to_string(),
            grace,
        }
    }

    fn record_fault(&self, fault: SolveError) {
        let reason = fault.to_string();
        self.flags().fault = Some(fault);
        self.alive.cancel();
        self.ctx.publish(
            Event::new(EventKind::ResolverFaulted)
                .with_source(Arc::clone(&self.name))
                .with_reason(reason),
        );
    }
}

/// Coalescing, single-worker driver for a [`Solve`] callback.
///
/// ### Responsibilities
/// - **Activation**: spawns a worker on the context executor when a change arrives while idle
/// - **Coalescing**: folds concurrent change reports into one more `solve()`
/// - **Quiescence**: lets callers wait until no worker is active and no change is pending
/// - **Shutdown**: `stop()` cancels a sleeping worker and waits for it
///
/// Dropping the `Resolver` cancels it: the worker exits at its next check.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use statevisor::{Config, Context, Resolution, Resolver, SolveError, SolveFn};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let ctx = Context::new(Config::default());
///     let backlog = Arc::new(AtomicU32::new(3));
///     let b = Arc::clone(&backlog);
///     let resolver = Resolver::new(&ctx, "drain", SolveFn::arc(move || {
///         let b = Arc::clone(&b);
///         async move {
///             match b.load(Ordering::SeqCst) {
///                 0 => Ok::<_, SolveError>(Resolution::Resolved),
///                 n => { b.store(n - 1, Ordering::SeqCst); Ok(Resolution::retry()) }
///             }
///         }
///     }));
///
///     resolver.report_change();
///     resolver.block_until_quiescent().await;
///     assert_eq!(backlog.load(Ordering::SeqCst), 0);
///     resolver.stop().await.unwrap();
/// }
/// ```
pub struct Resolver {
    shared: Arc<Shared>,
}

impl Resolver {
    /// Creates an idle resolver. Nothing runs until the first [`report_change`](Self::report_change).
    pub fn new(ctx: &Context, name: impl Into<Arc<str>>, solver: Arc<dyn Solve>) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                ctx: ctx.clone(),
                solver,
                flags: Mutex::new(Flags::default()),
                gate,
                alive: CancellationToken::new(),
                signals: AtomicU64::new(0),
                activations: AtomicU64::new(0),
                stop_reported: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the resolver name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Reports that the observed or desired state changed.
    ///
    /// Never blocks beyond a short critical section; callable from any thread.
    /// No-op once the resolver is stopped or faulted.
    pub fn report_change(&self) {
        self.shared.report_change();
    }

    /// Returns a cloneable handle that reports changes without owning the resolver.
    pub fn signal(&self) -> ChangeSignal {
        ChangeSignal {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Waits until no worker is active and no change is pending.
    ///
    /// Returns immediately when already quiescent.
    pub async fn block_until_quiescent(&self) {
        let mut rx = self.shared.gate.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }

    /// Returns true if no worker is active and no change is pending.
    pub fn is_quiescent(&self) -> bool {
        let flags = self.shared.flags();
        !flags.pending && !flags.active
    }

    /// Returns false after `stop()` or a fault.
    pub fn is_alive(&self) -> bool {
        !self.shared.alive.is_cancelled()
    }

    /// Returns the fault that stopped the resolver, if any.
    pub fn fault(&self) -> Option<SolveError> {
        self.shared.flags().fault.clone()
    }

    /// Number of accepted change reports.
    pub fn signals(&self) -> u64 {
        self.shared.signals.load(Ordering::Relaxed)
    }

    /// Number of workers spawned so far.
    pub fn activations(&self) -> u64 {
        self.shared.activations.load(Ordering::Relaxed)
    }

    /// Stops the resolver: no further `solve()` calls will start.
    ///
    /// Wakes a worker sleeping on a wait hint and waits for the active worker to
    /// exit, at most [`Config::grace`](crate::Config::grace); past that the
    /// worker is aborted and [`RuntimeError::GraceExceeded`] is returned.
    /// Does not guarantee the state was resolved. Calling it again is a no-op;
    /// concurrent callers all return only after the worker has exited.
    ///
    /// Must not be awaited from inside this resolver's own `solve()`.
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        let shared = &self.shared;
        shared.alive.cancel();
        let worker = shared.flags().worker.take();
        let grace = shared.ctx.config().stop_grace();

        let result = match worker {
            Some(mut worker) => match grace {
                Some(grace) => match time::timeout(grace, &mut worker).await {
                    Ok(_) => Ok(()),
                    Err(_) => {
                        worker.abort();
                        // An aborted worker never retired.
                        shared.retire_stopped();
                        Err(shared.grace_exceeded(grace))
                    }
                },
                None => {
                    let _ = worker.await;
                    Ok(())
                }
            },
            // Another stop() owns the worker: wait for it to retire.
            None => {
                let mut gate = shared.gate.subscribe();
                let retired = gate.wait_for(|open| *open);
                match grace {
                    Some(grace) => match time::timeout(grace, retired).await {
                        Ok(_) => Ok(()),
                        Err(_) => Err(shared.grace_exceeded(grace)),
                    },
                    None => {
                        let _ = retired.await;
                        Ok(())
                    }
                }
            }
        };

        if !shared.stop_reported.swap(true, Ordering::AcqRel) {
            shared
                .ctx
                .publish(Event::new(EventKind::ResolverStopped).with_source(Arc::clone(&shared.name)));
        }
        result
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        self.shared.alive.cancel();
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("name", &self.shared.name)
            .field("alive", &self.is_alive())
            .field("quiescent", &self.is_quiescent())
            .finish()
    }
}

/// Weak, cloneable handle for reporting changes to a [`Resolver`].
///
/// Useful for background work started by a `solve()` step: when it completes it
/// reports a change so the resolver re-examines the state.
#[derive(Clone)]
pub struct ChangeSignal {
    shared: Weak<Shared>,
}

impl ChangeSignal {
    /// Reports a change. Returns `false` if the resolver no longer exists.
    pub fn report_change(&self) -> bool {
        match self.shared.upgrade() {
            Some(shared) => {
                shared.report_change();
                true
            }
            None => false,
        }
    }

    /// Returns false once the resolver was dropped, stopped or faulted.
    pub fn is_alive(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| !shared.alive.is_cancelled())
    }
}

impl std::fmt::Debug for ChangeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSignal").finish_non_exhaustive()
    }
}
