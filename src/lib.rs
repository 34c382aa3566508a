//! Bytecache - an in-process byte cache
//!
//! Fronts an expensive data source with per-entry TTL, lazily and
//! periodically expired entries, and a total size budget enforced by
//! evicting the least recently used entries.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, StatsSnapshot};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
