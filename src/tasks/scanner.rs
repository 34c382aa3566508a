//! Expiry Scanner Task
//!
//! Background task that periodically finds time-expired entries and marks
//! them for the reaper. It never removes anything itself, so it only needs
//! shared access to the store.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::run_periodically;
use crate::cache::entry::current_timestamp_nanos;
use crate::cache::lookup::Shared;

/// Spawns the scanner, running one pass every `scan_interval` until shutdown.
pub(crate) fn spawn_scanner(shared: Arc<Shared>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let interval = shared.config.scan_interval;

    tokio::spawn(run_periodically("expiry-scanner", interval, shutdown, move || {
        let marked = shared.store.mark_expired(current_timestamp_nanos());
        if marked > 0 {
            debug!(marked, "Expiry scan marked entries");
        } else {
            trace!("Expiry scan found nothing new");
        }
    }))
}
