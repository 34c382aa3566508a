//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Error type for cache lookups.
///
/// Writes and deletes never fail, and background passes have no caller to
/// report to, so lookups are the only source of errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key is absent, or present but past its expiry time
    #[error("Key not found: {0}")]
    NotFound(String),
}

impl CacheError {
    /// Returns true for the not-found kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache lookups.
pub type Result<T> = std::result::Result<T, CacheError>;
