//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

// == Cache Entry ==
/// A single cached value and its bookkeeping.
///
/// `last_used` is atomic so that hits can refresh it while the store is only
/// held for shared access.
#[derive(Debug)]
pub struct CacheEntry {
    /// The stored payload
    pub data: Bytes,
    /// Expiration timestamp (Unix nanoseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// Last successful read or write (Unix nanoseconds)
    last_used: AtomicU64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry used at `now`, with optional TTL.
    pub fn new(data: Bytes, ttl: Option<Duration>, now: u64) -> Self {
        Self {
            data,
            expires_at: ttl.map(|ttl| deadline(now, ttl)),
            last_used: AtomicU64::new(now),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches its expiration time, so a TTL
    /// that has fully elapsed is never served.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }

    // == Usage ==
    /// Records a read at `now`.
    pub fn touch(&self, now: u64) {
        self.last_used.fetch_max(now, Ordering::Relaxed);
    }

    /// Returns the last-used timestamp.
    pub fn last_used(&self) -> u64 {
        self.last_used.load(Ordering::Relaxed)
    }

    /// Overrides the last-used timestamp.
    #[cfg(test)]
    pub(crate) fn set_last_used(&self, at: u64) {
        self.last_used.store(at, Ordering::Relaxed);
    }

    /// Size accounted against the budget.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in nanoseconds.
pub fn current_timestamp_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Absolute expiry for a TTL starting at `now`.
pub fn deadline(now: u64, ttl: Duration) -> u64 {
    let ttl = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
    now.saturating_add(ttl)
}
