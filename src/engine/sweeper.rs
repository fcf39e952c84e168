//! Background eviction sweeper.
//!
//! Runs `sweep()` on a fixed interval, independent of request handling, so
//! the key map cannot grow without bound. Idempotent by construction; the
//! interval should sit well below the entry TTL to bound staleness.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::store::EntryStore;

/// Periodic eviction task with a deterministic shutdown path.
#[derive(Clone)]
pub struct Sweeper {
    store: Arc<dyn EntryStore>,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl Sweeper {
    pub fn new(store: Arc<dyn EntryStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Signal the sweep loop to stop. Safe to call from any task, including
    /// before the loop has started.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run the sweep loop until shutdown.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; swallow it so
        // the first sweep happens one full interval after startup.
        ticker.tick().await;

        info!(interval_secs = self.interval.as_secs(), "sweeper started");

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("sweeper shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    let evicted = self.store.sweep();
                    if evicted > 0 {
                        info!(evicted, "sweeper evicted expired idempotency keys");
                    }
                }
            }
        }
    }

    /// Spawn the sweep loop onto the runtime.
    pub fn spawn(&self) -> JoinHandle<()> {
        let sweeper = self.clone();
        tokio::spawn(async move { sweeper.run().await })
    }
}
