//! # Admission Example
//!
//! Shows an `AdmissionController` with `ActivityLimits`:
//! - at most 2 activities run at once
//! - at most 1 `db` activity runs at once
//! - `interactive` requests overtake queued `batch` requests
//!
//! ## Run
//! ```bash
//! cargo run --example admission
//! ```

use std::{sync::Arc, time::Duration};
use statevisor::{ActivityLimits, AdmissionController, Config, Context};

async fn work(ctrl: AdmissionController, activity: &'static str, id: usize, ms: u64) -> anyhow::Result<()> {
    ctrl.execute(activity, async move {
        println!("{:>6}[{activity}#{id}] started", "");
        tokio::time::sleep(Duration::from_millis(ms)).await;
        println!("{:>6}[{activity}#{id}] done", "");
    })
    .await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let ctx = Context::new(Config::default());
    let limits = ActivityLimits::new(2)
        .with_max("db", 1)
        .with_priority("interactive", 10);
    let ctrl = AdmissionController::new(&ctx, "workers", Arc::new(limits));

    println!("Demo: 3 batch, 2 db, 2 interactive; cap 2, db cap 1");
    let mut handles = Vec::new();
    for (activity, n) in [("batch", 3), ("db", 2), ("interactive", 2)] {
        for id in 0..n {
            handles.push(tokio::spawn(work(ctrl.clone(), activity, id, 200)));
        }
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    println!(" └► running={} pending={}", ctrl.running_total(), ctrl.pending_len());

    for h in handles {
        h.await??;
    }
    ctrl.stop();
    println!(" └► all done, running={}", ctrl.running_total());
    Ok(())
}
