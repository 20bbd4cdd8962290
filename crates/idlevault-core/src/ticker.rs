//! Periodic snapshot recomputation.
//!
//! The ticker never mutates state. On every tick it reads the latest record
//! from the session's watch channel and emits a fresh [`Snapshot`], so
//! displayed vault fill, energy and boost countdowns move with the clock.

use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::economy::{Economy, Snapshot};
use crate::player::PlayerRecord;

/// Handle to a running tick loop.
pub struct Ticker {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<u64>,
}

impl Ticker {
    /// Spawn the loop on the current tokio runtime. The first snapshot is
    /// emitted immediately.
    pub fn spawn<F>(
        economy: Economy,
        mut records: watch::Receiver<PlayerRecord>,
        period: Duration,
        mut emit: F,
    ) -> Self
    where
        F: FnMut(Snapshot) + Send + 'static,
    {
        let (shutdown, mut stopped) = oneshot::channel::<()>();
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut ticks = 0u64;

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = interval.tick() => {
                        let record = records.borrow_and_update().clone();
                        emit(economy.snapshot(&record, now_ms()));
                        ticks += 1;
                        tracing::debug!(ticks, user_id = %record.user_id, "tick");
                    }
                }
            }

            tracing::debug!(ticks, "ticker stopped");
            ticks
        });

        Self {
            shutdown: Some(shutdown),
            handle,
        }
    }

    /// Stop the loop and wait for it. Returns how many ticks ran.
    pub async fn stop(mut self) -> u64 {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.handle.await {
            Ok(ticks) => ticks,
            Err(e) => {
                tracing::warn!("ticker task failed: {e}");
                0
            }
        }
    }
}

/// Wall-clock time in epoch milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
