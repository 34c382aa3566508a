//! Configuration Module
//!
//! Handles cache configuration, either built in code or loaded from
//! environment variables.

use std::env;
use std::time::Duration;

/// Default interval between reaper passes
pub const DEFAULT_CLEAR_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default interval between scanner passes
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default total size budget in bytes
pub const DEFAULT_SIZE_LIMIT: usize = 1024 * 1024; // 1 MB

/// Cache configuration parameters.
///
/// `size_limit` doubles as the per-item ceiling: a value whose length is
/// greater than or equal to it is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Sleep between reaper passes
    pub clear_interval: Duration,
    /// Sleep between scanner passes
    pub scan_interval: Duration,
    /// Total size budget in bytes
    pub size_limit: usize,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CLEAR_INTERVAL_SECS` - Reaper interval in seconds (default: 3600)
    /// - `CACHE_SCAN_INTERVAL_SECS` - Scanner interval in seconds (default: 3600)
    /// - `CACHE_SIZE_LIMIT` - Size budget in bytes (default: 1048576)
    ///
    /// Missing, unparseable or zero values fall back to the default.
    pub fn from_env() -> Self {
        Self {
            clear_interval: positive_env("CACHE_CLEAR_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CLEAR_INTERVAL),
            scan_interval: positive_env("CACHE_SCAN_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SCAN_INTERVAL),
            size_limit: positive_env("CACHE_SIZE_LIMIT")
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(DEFAULT_SIZE_LIMIT),
        }
    }

    /// Sets the reaper interval.
    pub fn with_clear_interval(mut self, interval: Duration) -> Self {
        self.clear_interval = interval;
        self
    }

    /// Sets the scanner interval.
    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    /// Sets the total size budget.
    pub fn with_size_limit(mut self, limit: usize) -> Self {
        self.size_limit = limit;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            clear_interval: DEFAULT_CLEAR_INTERVAL,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            size_limit: DEFAULT_SIZE_LIMIT,
        }
    }
}

fn positive_env(name: &str) -> Option<u64> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis_saturating(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
