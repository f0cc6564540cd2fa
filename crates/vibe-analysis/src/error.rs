//! Analysis error types.

use std::time::Duration;

use thiserror::Error;

pub type AnalyzeResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Analysis rejected: {0}")]
    Rejected(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AnalysisError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            message: message.into(),
        }
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether another attempt at the same frame may succeed.
    ///
    /// The endpoint gives no reliable signal for permanent failures, so any
    /// failed request is retried; caller mistakes and cancellation are not.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidInput(_) | Self::Cancelled | Self::Config(_)
        )
    }

    /// Metric label for this failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::HttpStatus { .. } => "http_status",
            Self::Rejected(_) => "rejected",
            Self::Timeout(_) => "timeout",
            Self::Request(_) => "request",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Cancelled => "cancelled",
            Self::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}
