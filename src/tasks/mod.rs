//! Background Tasks Module
//!
//! Contains the tasks that maintain the cache outside of any single call.
//!
//! # Tasks
//! - Scanner: marks time-expired entries at the configured scan interval
//! - Reaper: removes marked entries at the configured clear interval
//! - Compactor: evicts least recently used entries when a write exceeds the size budget

mod compactor;
mod reaper;
mod scanner;

use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use crate::config::millis_saturating;

pub use compactor::compact;
pub(crate) use compactor::{trigger_compaction, CompactionTrigger};
pub(crate) use reaper::spawn_reaper;
pub(crate) use scanner::spawn_scanner;

/// Floor for loop intervals so a zero setting cannot spin
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Runs `pass` every `interval` until `shutdown` turns true or its sender is dropped.
///
/// Cancellation is checked before each pass and interrupts the sleep, so the
/// loop never outlives the signal by more than the pass in progress.
async fn run_periodically<F>(
    name: &'static str,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut pass: F,
) where
    F: FnMut(),
{
    let interval = interval.max(MIN_INTERVAL);
    info!(
        task = name,
        interval_ms = millis_saturating(interval),
        "Starting background task"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        pass();

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(task = name, "Background task stopped");
}
