//! Cache error types.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur during cache operations.
///
/// A cache miss is never an error; lookups return `None`.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Persistence write failed: {0}")]
    PersistenceWriteFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    pub fn storage_unavailable(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::PersistenceWriteFailed(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// True if the store could not be opened at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CacheError::StorageUnavailable(_))
    }
}
