//! Size Compaction Task
//!
//! Evicts least recently used entries once a write pushes the cache over its
//! size budget. Triggers are single-flight: while a compaction is pending or
//! running, further over-budget writes fold into it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, trace, warn};

use crate::cache::lookup::Shared;
use crate::cache::Store;

/// Coalescing trigger for compaction runs.
#[derive(Debug, Default)]
pub(crate) struct CompactionTrigger {
    /// Set while a compaction is queued or running
    pending: AtomicBool,
}

impl CompactionTrigger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// Clears the pending flag when a pass ends, unwinding included.
struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Schedules a compaction unless one is already pending.
///
/// The pass runs on its own thread so the caller never waits on the
/// eviction. If no thread can be started the pass runs inline instead.
pub(crate) fn trigger_compaction(shared: &Arc<Shared>) {
    if shared.compaction.pending.swap(true, Ordering::AcqRel) {
        trace!("Compaction already pending, trigger coalesced");
        return;
    }

    let task_shared = Arc::clone(shared);
    let spawned = thread::Builder::new()
        .name("bytecache-compactor".to_string())
        .spawn(move || run_compaction(&task_shared));

    if let Err(err) = spawned {
        warn!(error = %err, "Failed to start compactor thread, compacting inline");
        run_compaction(shared);
    }
}

fn run_compaction(shared: &Shared) {
    let limit = shared.config.size_limit;
    loop {
        {
            let _pending = PendingGuard(&shared.compaction.pending);
            let evicted = compact(&shared.store, limit);
            shared.stats.record_compaction(evicted);
        }

        // A write that crossed the budget while this pass ran had its trigger
        // coalesced, so pick its work up here.
        if shared.store.size() <= limit || shared.compaction.pending.swap(true, Ordering::AcqRel) {
            return;
        }
    }
}

/// Evicts entries oldest-used first until the store is below `limit`.
///
/// Works on a snapshot: keys inserted after it are not candidates in this
/// pass, and keys removed since are skipped. Returns the number evicted.
pub fn compact(store: &Store, limit: usize) -> usize {
    let size_before = store.size();
    let mut usage = store.usage_snapshot();
    usage.sort_by_key(|(_, last_used)| *last_used);

    let evicted = store.evict_until_below(usage.into_iter().map(|(key, _)| key), limit);
    debug!(
        evicted,
        size_before,
        size_after = store.size(),
        limit,
        "Compaction finished"
    );
    evicted
}
