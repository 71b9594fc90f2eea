//! # Goal State Example
//!
//! Drives a simulated network link toward a goal:
//! - `Down -> Connecting` is asynchronous: a background dial finishes later
//! - while `Connecting`, the machine polls every 100ms until the dial reports back
//! - `Up -> Down` is synchronous
//! - state-changing transitions carry before/after hooks, printed in order
//!
//! ## Run
//! ```bash
//! cargo run --example goal_state --features "logging"
//! ```

#[cfg(not(feature = "logging"))]
compile_error!("error");

use std::{sync::Arc, time::Duration};
use statevisor::{Config, Context, DynamicState, LogWriter, StateHandle, Subscribe, Transition};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Link {
    Down,
    Connecting,
    Up,
}

fn dial(link: &StateHandle<Link, Link>) {
    let link = link.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        link.update_state(|s| *s = Link::Up);
    });
}

fn step(state: &Link, goal: &Link) -> Option<Transition<Link, Link>> {
    let transition = match (state, goal) {
        (s, g) if s == g => return None,
        (Link::Down, Link::Up) => {
            Transition::timed(|s: &mut Link, _: &Link, link: &StateHandle<Link, Link>| {
                *s = Link::Connecting;
                dial(link);
                // Re-check after 1s even if the dial never reports back.
                Duration::from_secs(1)
            })
        }
        // Still dialing: poll without hooks.
        (Link::Connecting, Link::Up) => {
            return Some(Transition::timed(|_: &mut Link, _: &Link, _: &StateHandle<Link, Link>| {
                Duration::from_millis(100)
            }));
        }
        (_, Link::Down) => Transition::sync(|s: &mut Link, _: &Link| *s = Link::Down),
        (_, _) => return None,
    };
    Some(transition.with_hooks(
        |s: &Link, g: &Link| println!("{:>6}before: {s:?} (goal {g:?})", ""),
        |s: &Link, g: &Link| println!("{:>6}after:  {s:?} (goal {g:?})", ""),
    ))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let ctx = Context::builder(Config::default()).with_subscribers(subs).build();

    // ============================================================
    // Demo -> Bring the link up (async dial, then settle)
    // ============================================================
    println!("Demo 1: Down -> Up");
    let link = DynamicState::new(&ctx, "link", Link::Down, Link::Up, step);
    link.block_until_goal_resolved().await;
    println!(" └► state = {:?}", link.state());
    println!();

    // ============================================================
    // Demo -> Same goal again: no activation
    // ============================================================
    println!("Demo 2: set_goal(Up) again");
    println!(" └► changed = {}", link.set_goal(Link::Up));
    println!();

    // ============================================================
    // Demo -> Take it down
    // ============================================================
    println!("Demo 3: Up -> Down");
    link.set_goal(Link::Down);
    link.block_until_goal_resolved().await;
    println!(" └► state = {:?}", link.state());

    link.stop().await?;
    // Let the log subscriber drain.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
