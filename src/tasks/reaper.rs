//! Expiry Reaper Task
//!
//! Background task that periodically removes every entry marked expired,
//! whether it was marked by a lookup or by the scanner.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::run_periodically;
use crate::cache::lookup::Shared;

/// Spawns the reaper, running one pass every `clear_interval` until shutdown.
pub(crate) fn spawn_reaper(shared: Arc<Shared>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let interval = shared.config.clear_interval;

    tokio::spawn(run_periodically("expiry-reaper", interval, shutdown, move || {
        let removed = shared.store.reap_expired();
        shared.stats.record_expired(removed);
        if removed > 0 {
            debug!(removed, remaining = shared.store.len(), "Reaped expired entries");
        } else {
            trace!("Nothing to reap");
        }
    }))
}
