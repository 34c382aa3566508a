//! Cache Lookup Module
//!
//! The public read/write API. Composes the store, expiry tracking and the
//! size budget, and owns the background tasks' shared state.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::watch;
use tracing::{debug, info, trace};

use crate::cache::entry::current_timestamp_nanos;
use crate::cache::{CacheStats, Lookup, StatsSnapshot, Store};
use crate::config::{millis_saturating, CacheConfig};
use crate::error::{CacheError, Result};
use crate::tasks::{self, CompactionTrigger};

// == Shared State ==
/// State shared between cache handles and background tasks.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) store: Store,
    pub(crate) stats: CacheStats,
    pub(crate) config: CacheConfig,
    pub(crate) compaction: CompactionTrigger,
}

impl Shared {
    pub(crate) fn new(config: CacheConfig) -> Self {
        Self {
            store: Store::new(),
            stats: CacheStats::new(),
            config,
            compaction: CompactionTrigger::new(),
        }
    }
}

// == Cache ==
/// In-process byte cache with per-entry TTL and a total size budget.
///
/// Cloning is cheap; every clone refers to the same storage. All operations
/// are synchronous and only ever wait on brief in-memory lock acquisition.
///
/// # Example
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
/// let cache = Cache::new(shutdown_rx, CacheConfig::default());
///
/// cache.put_with_ttl("user:1", "alice", Duration::from_secs(30));
/// let value = cache.get("user:1")?;
///
/// // Stops the scanner and reaper
/// shutdown_tx.send(true)?;
/// ```
#[derive(Debug, Clone)]
pub struct Cache {
    shared: Arc<Shared>,
}

impl Cache {
    // == Constructor ==
    /// Creates a cache and starts its scanner and reaper.
    ///
    /// The background tasks run until `shutdown` turns `true` or its sender
    /// is dropped.
    ///
    /// # Panics
    /// Panics if called outside the context of a Tokio runtime.
    pub fn new(shutdown: watch::Receiver<bool>, config: CacheConfig) -> Self {
        info!(
            clear_interval_ms = millis_saturating(config.clear_interval),
            scan_interval_ms = millis_saturating(config.scan_interval),
            size_limit = config.size_limit,
            "Creating cache"
        );

        let shared = Arc::new(Shared::new(config));
        tasks::spawn_scanner(Arc::clone(&shared), shutdown.clone());
        tasks::spawn_reaper(Arc::clone(&shared), shutdown);

        Self { shared }
    }

    // == Get ==
    /// Retrieves the value stored under `key`.
    ///
    /// An entry past its expiry is reported as not found and marked for the
    /// reaper; it is not removed here.
    pub fn get(&self, key: &str) -> Result<Bytes> {
        match self.shared.store.get(key, current_timestamp_nanos()) {
            Lookup::Hit(data) => {
                self.shared.stats.record_hit();
                Ok(data)
            }
            Lookup::Expired => {
                trace!(key, "Lazily marked expired entry");
                self.shared.stats.record_miss();
                Err(CacheError::NotFound(key.to_string()))
            }
            Lookup::Missing => {
                self.shared.stats.record_miss();
                Err(CacheError::NotFound(key.to_string()))
            }
        }
    }

    // == Get Or Compute ==
    /// Returns the cached value, or computes, stores and returns it on a miss.
    ///
    /// The callback runs on the calling thread. Its error is returned as is
    /// and nothing is cached. Concurrent misses on the same key may each run
    /// the callback; the last write wins.
    pub fn get_or_compute<F, D, E>(&self, key: &str, compute: F) -> std::result::Result<Bytes, E>
    where
        F: FnOnce(&str) -> std::result::Result<D, E>,
        D: Into<Bytes>,
    {
        self.get_or_compute_inner(key, None, compute)
    }

    /// Like [`Cache::get_or_compute`], storing a computed value with `ttl`.
    pub fn get_or_compute_with_ttl<F, D, E>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> std::result::Result<Bytes, E>
    where
        F: FnOnce(&str) -> std::result::Result<D, E>,
        D: Into<Bytes>,
    {
        self.get_or_compute_inner(key, Some(ttl), compute)
    }

    fn get_or_compute_inner<F, D, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> std::result::Result<Bytes, E>
    where
        F: FnOnce(&str) -> std::result::Result<D, E>,
        D: Into<Bytes>,
    {
        if let Ok(data) = self.get(key) {
            return Ok(data);
        }

        let data: Bytes = compute(key)?.into();
        self.store_value(key.to_string(), data.clone(), ttl);
        Ok(data)
    }

    // == Has ==
    /// Returns true if a live entry exists. Does not count as a use.
    pub fn has(&self, key: &str) -> bool {
        self.shared.store.contains_live(key, current_timestamp_nanos())
    }

    // == Delete ==
    /// Removes an entry. Deleting an absent key is a no-op.
    pub fn delete(&self, key: &str) {
        self.shared.store.remove(key);
    }

    // == Put ==
    /// Stores a value without expiry.
    ///
    /// Values whose length is at or above the size limit are silently dropped.
    pub fn put(&self, key: impl Into<String>, data: impl Into<Bytes>) {
        self.store_value(key.into(), data.into(), None);
    }

    /// Stores a value that expires after `ttl`.
    ///
    /// Values whose length is at or above the size limit are silently dropped.
    pub fn put_with_ttl(&self, key: impl Into<String>, data: impl Into<Bytes>, ttl: Duration) {
        self.store_value(key.into(), data.into(), Some(ttl));
    }

    fn store_value(&self, key: String, data: Bytes, ttl: Option<Duration>) {
        let limit = self.shared.config.size_limit;
        if data.len() >= limit {
            debug!(key = %key, size = data.len(), limit, "Rejected value over size limit");
            self.shared.stats.record_rejected();
            return;
        }

        let total = self
            .shared
            .store
            .insert(key, data, ttl, current_timestamp_nanos());
        if total > limit {
            tasks::trigger_compaction(&self.shared);
        }
    }

    // == Introspection ==
    /// Number of stored entries, expired-but-unreaped included.
    pub fn len(&self) -> usize {
        self.shared.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.store.is_empty()
    }

    /// Total stored bytes.
    pub fn size(&self) -> usize {
        self.shared.store.size()
    }

    pub fn size_limit(&self) -> usize {
        self.shared.config.size_limit
    }

    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    /// Number of keys marked expired and awaiting the reaper.
    pub fn pending_expired(&self) -> usize {
        self.shared.store.pending_expired()
    }

    /// Whether `key` is still physically stored, even if expired.
    pub fn is_stored(&self, key: &str) -> bool {
        self.shared.store.contains_key(key)
    }

    /// Recomputes the stored size by full scan and checks it against the
    /// running counter. Meant for validation, not the hot path.
    pub fn verify_size(&self) -> bool {
        self.shared.store.computed_size() == self.shared.store.size()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> StatsSnapshot {
        let store = &self.shared.store;
        self.shared
            .stats
            .snapshot(store.len(), store.size(), self.shared.config.size_limit)
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}
