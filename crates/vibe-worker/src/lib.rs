//! VibeEnglish narration worker.
//!
//! Wires the frame cache and the batch orchestrator into one cache-first
//! pipeline:
//! 1. Serve a cached analysis result when present
//! 2. Otherwise cache the frames and analyze them in batches
//! 3. Write complete results back to the cache

pub mod config;
pub mod error;
pub mod frames;
pub mod logging;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use frames::load_frames_dir;
pub use logging::{init_tracing, RunLogger};
pub use pipeline::{PipelineOutput, SubtitlePipeline, DEFAULT_MAX_FRAMES};
