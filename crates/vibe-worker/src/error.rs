//! Worker error types.

use thiserror::Error;

use vibe_analysis::AnalysisError;
use vibe_cache::CacheError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Analysis(e) => e.is_retryable(),
            WorkerError::Cache(e) => !e.is_unavailable(),
            WorkerError::Io(_) => true,
            WorkerError::InvalidInput(_) | WorkerError::ConfigError(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(!WorkerError::invalid_input("no frames").is_retryable());
        assert!(!WorkerError::from(AnalysisError::invalid_input("empty")).is_retryable());
        assert!(WorkerError::from(AnalysisError::http_status(502, "Bad Gateway")).is_retryable());
        assert!(!WorkerError::from(CacheError::storage_unavailable("denied")).is_retryable());
    }
}
