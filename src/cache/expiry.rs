//! Expiry Tracker Module
//!
//! Holds the keys known to be expired but not yet reclaimed.

use std::collections::HashSet;

use parking_lot::Mutex;

// == Expiry Tracker ==
/// Set of keys believed expired and awaiting removal by the reaper.
///
/// Kept behind its own lock, separate from the store, so that marking from
/// the read path never waits on a full-table scan. When both locks are
/// needed the store lock is always taken first.
#[derive(Debug, Default)]
pub struct ExpiryTracker {
    pending: Mutex<HashSet<String>>,
}

impl ExpiryTracker {
    // == Constructor ==
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Mark ==
    /// Marks a key as expired. Returns true if it was not already marked.
    pub fn mark(&self, key: &str) -> bool {
        let mut pending = self.pending.lock();
        if pending.contains(key) {
            return false;
        }
        pending.insert(key.to_string())
    }

    /// Marks every key in `keys`, returning how many were newly marked.
    pub fn mark_all<I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut pending = self.pending.lock();
        keys.into_iter().filter(|key| pending.insert(key.clone())).count()
    }

    // == Unmark ==
    /// Clears the mark for a key, if any.
    pub fn unmark(&self, key: &str) {
        self.pending.lock().remove(key);
    }

    // == Drain ==
    /// Atomically empties the tracker and returns what it held.
    pub fn drain(&self) -> HashSet<String> {
        std::mem::take(&mut *self.pending.lock())
    }

    // == Inspection ==
    pub fn contains(&self, key: &str) -> bool {
        self.pending.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
