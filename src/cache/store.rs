//! Cache Store Module
//!
//! Key to entry mapping with incremental size accounting. The store owns the
//! expiry tracker so that every path touching both takes the locks in one
//! order: entries first, then the tracker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::cache::{CacheEntry, ExpiryTracker};

// == Lookup Outcome ==
/// Result of a store lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Live entry; its last-used time was refreshed
    Hit(Bytes),
    /// Entry exists but is past its expiry; it is now marked for reaping
    Expired,
    /// No entry for the key
    Missing,
}

// == Cache Store ==
/// Concurrent storage for cache entries.
///
/// `total_size` is only changed while the entries lock is held exclusively,
/// but is readable without any lock for cheap budget checks.
#[derive(Debug, Default)]
pub struct Store {
    /// Key-value storage
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Keys marked expired, awaiting the reaper
    expired: ExpiryTracker,
    /// Sum of payload lengths over all entries
    total_size: AtomicUsize,
}

impl Store {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Stores `data` under `key`, replacing any previous entry.
    ///
    /// Clears any pending expiry mark for the key and returns the new total size.
    pub fn insert(&self, key: String, data: Bytes, ttl: Option<Duration>, now: u64) -> usize {
        let added = data.len();
        let entry = CacheEntry::new(data, ttl, now);

        let mut entries = self.entries.write();
        let removed = entries.insert(key.clone(), entry).map_or(0, |old| old.size());
        self.expired.unmark(&key);

        if added >= removed {
            self.total_size.fetch_add(added - removed, Ordering::AcqRel) + (added - removed)
        } else {
            self.total_size.fetch_sub(removed - added, Ordering::AcqRel) - (removed - added)
        }
    }

    // == Get ==
    /// Looks up a key under shared access.
    ///
    /// Hits refresh the entry's last-used time. An expired entry is marked in
    /// the tracker and reported as such, but left in place for the reaper.
    pub fn get(&self, key: &str, now: u64) -> Lookup {
        let entries = self.entries.read();
        match entries.get(key) {
            None => Lookup::Missing,
            Some(entry) if entry.is_expired_at(now) => {
                self.expired.mark(key);
                Lookup::Expired
            }
            Some(entry) => {
                entry.touch(now);
                Lookup::Hit(entry.data.clone())
            }
        }
    }

    // == Contains ==
    /// Returns true if a live entry exists. Does not refresh usage.
    pub fn contains_live(&self, key: &str, now: u64) -> bool {
        self.entries
            .read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    // == Remove ==
    /// Removes an entry, returning its size, or 0 if it was absent.
    pub fn remove(&self, key: &str) -> usize {
        let mut entries = self.entries.write();
        self.remove_locked(&mut entries, key).unwrap_or(0)
    }

    fn remove_locked(&self, entries: &mut HashMap<String, CacheEntry>, key: &str) -> Option<usize> {
        self.expired.unmark(key);
        let size = entries.remove(key)?.size();
        self.total_size.fetch_sub(size, Ordering::AcqRel);
        Some(size)
    }

    // == Scan Expired ==
    /// Marks every entry expired at `now` without removing it.
    ///
    /// Returns the number of keys newly marked.
    pub fn mark_expired(&self, now: u64) -> usize {
        let entries = self.entries.read();
        let expired = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone());
        self.expired.mark_all(expired)
    }

    // == Reap Expired ==
    /// Drains the tracker and removes every drained key still present.
    ///
    /// Returns the number of entries removed.
    pub fn reap_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let mut removed = 0;
        for key in self.expired.drain() {
            if let Some(entry) = entries.remove(&key) {
                self.total_size.fetch_sub(entry.size(), Ordering::AcqRel);
                removed += 1;
            }
        }
        removed
    }

    // == Compaction Support ==
    /// Snapshots every key with its last-used time.
    pub fn usage_snapshot(&self) -> Vec<(String, u64)> {
        self.entries
            .read()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.last_used()))
            .collect()
    }

    /// Removes keys in the given order until the total size is below `limit`.
    ///
    /// Keys that have vanished since the snapshot are skipped. Returns the
    /// number of entries evicted.
    pub fn evict_until_below<I>(&self, order: I, limit: usize) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut entries = self.entries.write();
        let mut evicted = 0;
        for key in order {
            if self.size() < limit {
                break;
            }
            if self.remove_locked(&mut entries, &key).is_some() {
                evicted += 1;
            }
        }
        evicted
    }

    // == Accounting ==
    /// Current total size from the atomic counter.
    pub fn size(&self) -> usize {
        self.total_size.load(Ordering::Acquire)
    }

    /// Recomputes the total size with a full scan.
    pub fn computed_size(&self) -> usize {
        self.entries.read().values().map(CacheEntry::size).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of keys awaiting the reaper.
    pub fn pending_expired(&self) -> usize {
        self.expired.len()
    }

    pub fn is_marked_expired(&self, key: &str) -> bool {
        self.expired.contains(key)
    }

    /// Whether the key is physically present, expired or not.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Rewrites an entry's last-used time.
    #[cfg(test)]
    pub(crate) fn set_last_used(&self, key: &str, at: u64) {
        if let Some(entry) = self.entries.read().get(key) {
            entry.set_last_used(at);
        }
    }
}
