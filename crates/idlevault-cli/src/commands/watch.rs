use std::time::Duration;

use idlevault_core::Ticker;
use tokio::sync::mpsc;

use super::{open, CliResult, PlayerArgs};

/// Print one snapshot per tick as a JSON line. Runs until `ticks` snapshots
/// were printed, or forever.
pub fn run(args: &PlayerArgs, ticks: Option<u64>) -> CliResult {
    let ctx = open(args)?;
    let period = Duration::from_millis(ctx.config.session.tick_interval_ms);
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async move {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ticker = Ticker::spawn(
            ctx.session.economy().clone(),
            ctx.session.subscribe(),
            period,
            move |snapshot| {
                let _ = tx.send(snapshot);
            },
        );

        let mut printed = 0u64;
        while let Some(snapshot) = rx.recv().await {
            println!("{}", serde_json::to_string(&snapshot)?);
            printed += 1;
            if ticks.is_some_and(|n| printed >= n) {
                break;
            }
        }

        let ran = ticker.stop().await;
        tracing::debug!(ran, printed, "watch finished");
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
