//! # Runtime events emitted by resolvers, state machines and admission controllers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Resolver events**: worker activation, deferral, idling, faults, shutdown
//! - **State machine events**: goal changes, applied transitions, hook failures
//! - **Admission events**: queueing, admission, completion and protocol misuse
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! emitting component (`source`), activity names and delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use statevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::SolveDeferred)
//!     .with_source("link-monitor")
//!     .with_delay(Duration::from_millis(250));
//!
//! assert_eq!(ev.kind, EventKind::SolveDeferred);
//! assert_eq!(ev.source.as_deref(), Some("link-monitor"));
//! assert_eq!(ev.delay_ms, Some(250));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Resolver events ===
    /// A change was reported while idle and a worker was spawned.
    ///
    /// Sets:
    /// - `source`: resolver name
    ResolverActivated,

    /// `solve()` asked to be called again after a delay.
    ///
    /// Sets:
    /// - `source`: resolver name
    /// - `delay_ms`: wait hint (ms)
    SolveDeferred,

    /// The worker observed a resolved state with no pending change and exited.
    ///
    /// Sets:
    /// - `source`: resolver name
    ResolverIdle,

    /// `solve()` failed or panicked; the resolver stopped itself.
    ///
    /// Sets:
    /// - `source`: resolver name
    /// - `reason`: fault message
    ResolverFaulted,

    /// The resolver was stopped by its owner.
    ///
    /// Sets:
    /// - `source`: resolver name
    ResolverStopped,

    // === State machine events ===
    /// The goal of a state machine was replaced by a different value.
    ///
    /// Sets:
    /// - `source`: state machine name
    GoalChanged,

    /// A transition act ran.
    ///
    /// Sets:
    /// - `source`: state machine name
    /// - `delay_ms`: wait hint returned by the act (absent for synchronous acts)
    TransitionApplied,

    /// A before/after hook panicked on the sequential queue.
    ///
    /// Sets:
    /// - `source`: queue name
    /// - `reason`: panic info/message
    HookPanicked,

    // === Admission events ===
    /// An activity request entered the pending queue.
    ///
    /// Sets:
    /// - `source`: controller name
    /// - `activity`: activity name
    /// - `priority`: priority captured at enqueue time
    ActivityQueued,

    /// An activity was admitted.
    ///
    /// Sets:
    /// - `source`: controller name
    /// - `activity`: activity name
    /// - `running`: running count of that activity after admission
    ActivityAdmitted,

    /// An admitted activity ended.
    ///
    /// Sets:
    /// - `source`: controller name
    /// - `activity`: activity name
    /// - `running`: running count of that activity after the end
    ActivityEnded,

    /// `activity_ended` was called for an activity that is not running.
    ///
    /// Sets:
    /// - `source`: controller name
    /// - `activity`: activity name
    ActivityMismatch,

    /// Admission policy code panicked; the controller closed itself.
    ///
    /// Sets:
    /// - `source`: controller name
    /// - `reason`: panic info/message
    ControllerFaulted,

    /// The controller was stopped by its owner.
    ///
    /// Sets:
    /// - `source`: controller name
    ControllerStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the emitting component.
    pub source: Option<Arc<str>>,
    /// Activity name (admission events).
    pub activity: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Priority captured for an activity request.
    pub priority: Option<i32>,
    /// Running count of an activity.
    pub running: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            source: None,
            activity: None,
            reason: None,
            delay_ms: None,
            priority: None,
            running: None,
        }
    }

    /// Attaches the emitting component name.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches an activity name.
    #[inline]
    pub fn with_activity(mut self, activity: impl Into<Arc<str>>) -> Self {
        self.activity = Some(activity.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a request priority.
    #[inline]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Attaches a running count.
    #[inline]
    pub fn with_running(mut self, n: usize) -> Self {
        self.running = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_source(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_source(subscriber)
            .with_reason(info)
    }

    /// True if this event reports a subscriber queue overflow.
    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// True for faults raised by user code (solve, hooks, admission policy).
    #[inline]
    pub fn is_fault(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ResolverFaulted | EventKind::ControllerFaulted | EventKind::HookPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::ResolverIdle);
        let b = Event::new(EventKind::ResolverIdle);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates() {
        let ev = Event::new(EventKind::SolveDeferred).with_delay(Duration::from_secs(u64::MAX / 2));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn test_fault_classification() {
        assert!(Event::new(EventKind::ResolverFaulted).is_fault());
        assert!(Event::new(EventKind::HookPanicked).is_fault());
        assert!(!Event::new(EventKind::ActivityAdmitted).is_fault());
    }
}
