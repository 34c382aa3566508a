//! Cache Statistics Module
//!
//! Tracks cache activity: hits, misses, rejected writes, evictions and reaped entries.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Lock-free activity counters shared by the API and background tasks.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    rejected: AtomicU64,
    evictions: AtomicU64,
    expired: AtomicU64,
    compactions: AtomicU64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Recorders ==
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a write dropped for being at or over the size limit.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one compaction pass and the entries it evicted.
    pub fn record_compaction(&self, evicted: usize) {
        self.compactions.fetch_add(1, Ordering::Relaxed);
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    /// Counts entries physically removed by the reaper.
    pub fn record_expired(&self, removed: usize) {
        self.expired.fetch_add(removed as u64, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Captures the counters together with the current store figures.
    pub fn snapshot(&self, total_entries: usize, total_size: usize, size_limit: usize) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            compactions: self.compactions.load(Ordering::Relaxed),
            total_entries,
            total_size,
            size_limit,
            taken_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time view of cache statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Successful lookups
    pub hits: u64,
    /// Lookups for absent or expired keys
    pub misses: u64,
    /// Writes dropped for exceeding the size limit
    pub rejected: u64,
    /// Entries removed by compaction
    pub evictions: u64,
    /// Entries removed by the reaper
    pub expired: u64,
    /// Completed compaction passes
    pub compactions: u64,
    /// Entries currently stored, expired-but-unreaped included
    pub total_entries: usize,
    /// Bytes currently stored
    pub total_size: usize,
    /// Configured size budget
    pub size_limit: usize,
    /// RFC 3339 capture time
    pub taken_at: String,
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
