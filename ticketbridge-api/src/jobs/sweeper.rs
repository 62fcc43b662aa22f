//! Store Sweep Background Task
//!
//! One task per store. Each tick removes every expired entry; reads already
//! treat expired entries as absent, so the sweep only bounds memory.
//!
//! | Store          | Default interval |
//! |----------------|------------------|
//! | `idempotency`  | 5 minutes        |
//! | `ticket_index` | 30 minutes       |
//! | `replay_guard` | 1 minute         |

use crate::telemetry::with_metrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use ticketbridge_storage::Sweep;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

// ============================================================================
// METRICS
// ============================================================================

/// Counters for one sweep task.
#[derive(Debug, Default)]
pub struct SweepMetrics {
    /// Entries removed since startup
    pub evicted: AtomicU64,

    /// Sweep cycles completed
    pub cycles: AtomicU64,
}

impl SweepMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SweepSnapshot {
        SweepSnapshot {
            evicted: self.evicted.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of sweep metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSnapshot {
    pub evicted: u64,
    pub cycles: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Sweep `store` every `every` until the shutdown signal is received.
///
/// Also stops if the shutdown sender is dropped. Returns the metrics
/// collected during the task's lifetime.
pub async fn sweep_task(
    store: Arc<dyn Sweep>,
    every: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<SweepMetrics> {
    let metrics = Arc::new(SweepMetrics::new());
    let name = store.store_name();

    let mut ticker = interval(every.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(store = name, interval_secs = every.as_secs(), "Sweep task started");

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!(store = name, "Sweep task shutting down");
                    break;
                }
            }

            _ = ticker.tick() => {
                sweep_once(store.as_ref(), &metrics);
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        store = name,
        evicted = snapshot.evicted,
        cycles = snapshot.cycles,
        "Sweep task completed"
    );

    metrics
}

fn sweep_once(store: &dyn Sweep, metrics: &SweepMetrics) {
    let name = store.store_name();
    let evicted = store.sweep_expired();

    metrics.cycles.fetch_add(1, Ordering::Relaxed);
    metrics.evicted.fetch_add(evicted as u64, Ordering::Relaxed);

    if evicted > 0 {
        with_metrics(|m| m.record_sweep_evictions(name, evicted));
        tracing::debug!(store = name, evicted, remaining = store.len(), "Swept expired entries");
    } else {
        tracing::trace!(store = name, "Sweep found nothing to evict");
    }
}

/// Spawn one [`sweep_task`] per scheduled store.
pub fn spawn_sweepers(
    schedule: Vec<(Arc<dyn Sweep>, Duration)>,
    shutdown_rx: watch::Receiver<bool>,
) -> Vec<JoinHandle<Arc<SweepMetrics>>> {
    schedule
        .into_iter()
        .map(|(store, every)| tokio::spawn(sweep_task(store, every, shutdown_rx.clone())))
        .collect()
}
