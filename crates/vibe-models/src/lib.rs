//! Shared data models for VibeEnglish.
//!
//! This crate provides Serde-serializable types for:
//! - Video identity derived from file metadata
//! - Extracted frame records
//! - Narration styles
//! - AI analysis results (narrative entries, vocabulary)
//! - Cache entries and persisted progress records

pub mod analysis;
pub mod cache_entry;
pub mod frame;
pub mod progress;
pub mod style;
pub mod timestamp;
pub mod video;

// Re-export common types
pub use analysis::{
    AnalysisMode, AnalysisResult, ContextContinuity, NarrativeEntry, Vocabulary, VocabularyLevel,
};
pub use cache_entry::CacheEntry;
pub use frame::FrameRecord;
pub use progress::{ProgressRecord, ProgressStatus};
pub use style::{Style, StyleParseError};
pub use timestamp::{frame_timestamp, DEFAULT_FRAME_INTERVAL_SECS};
pub use video::{VideoId, VideoKey};
