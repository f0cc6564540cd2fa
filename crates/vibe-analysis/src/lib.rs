//! Frame narration through an external analysis endpoint.
//!
//! This crate provides:
//! - [`BatchOrchestrator`]: batched concurrent dispatch with per-frame retry
//! - [`HttpFrameAnalyzer`]: the HTTP client for the analysis endpoint
//! - [`NetworkProbe`] strategies and adaptive batch sizing
//! - Prometheus-style metrics via the `metrics` facade

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod network;
pub mod orchestrator;
pub mod retry;

pub use client::{FrameAnalyzer, FrameRequest, HttpFrameAnalyzer};
pub use config::OrchestratorConfig;
pub use error::{AnalysisError, AnalyzeResult};
pub use network::{
    adaptive_batch_size, BandwidthClass, FixedNetworkProbe, HttpNetworkProbe, LatencyClass,
    NetworkCondition, NetworkProbe,
};
pub use orchestrator::{
    BatchOrchestrator, BatchOutcome, BatchTask, PerformanceStats, ProgressFn, ProgressUpdate,
    TaskStatus,
};
pub use retry::{BackoffStrategy, RetryPolicy};
