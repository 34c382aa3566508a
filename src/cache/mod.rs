//! Cache Module
//!
//! Provides the in-memory byte cache with TTL expiration and size-bounded
//! least-recently-used compaction.

pub(crate) mod entry;
mod expiry;
pub(crate) mod lookup;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_nanos, CacheEntry};
pub use expiry::ExpiryTracker;
pub use lookup::Cache;
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{Lookup, Store};
