//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [activated] source="link"
//! [deferred] source="link" delay_ms=50
//! [transition] source="link" delay_ms=None
//! [idle] source="link"
//! [queued] source="downloads" activity="fetch" priority=5
//! [admitted] source="downloads" activity="fetch" running=1
//! [ended] source="downloads" activity="fetch" running=0
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let src = e.source.as_deref().unwrap_or("unknown");
        match e.kind {
            EventKind::ResolverActivated => println!("[activated] source={src:?}"),
            EventKind::SolveDeferred => {
                println!("[deferred] source={src:?} delay_ms={:?}", e.delay_ms)
            }
            EventKind::ResolverIdle => println!("[idle] source={src:?}"),
            EventKind::ResolverFaulted => {
                println!("[faulted] source={src:?} err={:?}", e.reason)
            }
            EventKind::ResolverStopped => println!("[stopped] source={src:?}"),
            EventKind::GoalChanged => println!("[goal-changed] source={src:?}"),
            EventKind::TransitionApplied => {
                println!("[transition] source={src:?} delay_ms={:?}", e.delay_ms)
            }
            EventKind::HookPanicked => {
                println!("[hook-panicked] source={src:?} info={:?}", e.reason)
            }
            EventKind::ActivityQueued => println!(
                "[queued] source={src:?} activity={:?} priority={:?}",
                e.activity, e.priority
            ),
            EventKind::ActivityAdmitted => println!(
                "[admitted] source={src:?} activity={:?} running={:?}",
                e.activity, e.running
            ),
            EventKind::ActivityEnded => println!(
                "[ended] source={src:?} activity={:?} running={:?}",
                e.activity, e.running
            ),
            EventKind::ActivityMismatch => {
                println!("[mismatch] source={src:?} activity={:?}", e.activity)
            }
            EventKind::ControllerFaulted => {
                println!("[controller-faulted] source={src:?} err={:?}", e.reason)
            }
            EventKind::ControllerStopped => println!("[controller-stopped] source={src:?}"),
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={src} reason={:?}", e.reason)
            }
            EventKind::SubscriberPanicked => println!(
                "[subscriber-panicked] subscriber={src} info={}",
                e.reason.as_deref().unwrap_or("unknown"),
            ),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
