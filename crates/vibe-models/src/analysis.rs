//! AI narration result models.
//!
//! Field names follow the analysis endpoint's snake_case JSON so results can
//! be cached and re-served without translation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::style::Style;
use crate::timestamp::{frame_timestamp, DEFAULT_FRAME_INTERVAL_SECS};

/// CEFR band reported for a vocabulary item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum VocabularyLevel {
    #[serde(rename = "C1/C2")]
    C1C2,
    #[serde(rename = "B2")]
    B2,
    #[serde(rename = "B1/B2")]
    B1B2,
    #[serde(rename = "A1/A2")]
    A1A2,
}

/// A vocabulary item highlighted in a narration sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Vocabulary {
    pub word: String,
    pub lemma: String,
    pub level: VocabularyLevel,
    pub frequency: String,
    pub pos: String,
    /// Bounding polygon of the object the word refers to, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContextContinuity {
    pub previous_sentence: String,
}

/// Narration for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NarrativeEntry {
    pub frame_index: u32,
    pub timestamp: String,
    pub sentence: String,
    #[serde(default)]
    pub advanced_vocabulary: Vec<Vocabulary>,
    #[serde(default)]
    pub core_word: String,
    #[serde(default)]
    pub vocabulary_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_continuity: Option<ContextContinuity>,
    /// Set when the frame could not be analyzed; `sentence` is empty then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NarrativeEntry {
    /// Entry standing in for a frame whose analysis failed.
    pub fn placeholder(frame_index: u32, error: impl Into<String>) -> Self {
        Self {
            frame_index,
            timestamp: frame_timestamp(frame_index, DEFAULT_FRAME_INTERVAL_SECS),
            sentence: String::new(),
            advanced_vocabulary: Vec::new(),
            core_word: String::new(),
            vocabulary_count: 0,
            context_continuity: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// How a result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Normal,
    SlidingWindow,
    Parallel,
    SlidingWindowParallel,
}

impl AnalysisMode {
    /// Mode reported for batched concurrent processing.
    pub fn parallel(use_continuity: bool) -> Self {
        if use_continuity {
            Self::SlidingWindowParallel
        } else {
            Self::Parallel
        }
    }
}

/// Narration result for a whole video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    pub video_narrative: Vec<NarrativeEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<AnalysisMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_frames: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

impl AnalysisResult {
    /// Plain result carrying only narration entries.
    pub fn from_narrative(video_narrative: Vec<NarrativeEntry>) -> Self {
        Self {
            total_frames: Some(video_narrative.len() as u32),
            video_narrative,
            mode: None,
            context_type: None,
            style: None,
            failed_frames: Vec::new(),
            processing_time_ms: None,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_empty_and_tagged() {
        let entry = NarrativeEntry::placeholder(3, "HTTP 500");
        assert_eq!(entry.frame_index, 3);
        assert_eq!(entry.timestamp, "00:06");
        assert!(entry.sentence.is_empty());
        assert_eq!(entry.vocabulary_count, 0);
        assert!(entry.is_failed());
    }

    #[test]
    fn test_narrative_entry_from_endpoint_json() {
        let json = serde_json::json!({
            "frame_index": 0,
            "timestamp": "00:00",
            "sentence": "A cat is sleeping on the sofa.",
            "advanced_vocabulary": [{
                "word": "sofa",
                "lemma": "sofa",
                "level": "B1/B2",
                "frequency": "high",
                "pos": "noun"
            }],
            "core_word": "sofa",
            "vocabulary_count": 1
        });

        let entry: NarrativeEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.advanced_vocabulary[0].level, VocabularyLevel::B1B2);
        assert!(entry.advanced_vocabulary[0].coordinates.is_none());
        assert!(!entry.is_failed());
    }

    #[test]
    fn test_analysis_result_tolerates_minimal_json() {
        let json = serde_json::json!({
            "video_narrative": [],
            "mode": "sliding_window"
        });
        let result: AnalysisResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.mode, Some(AnalysisMode::SlidingWindow));
        assert!(result.failed_frames.is_empty());
        assert!(!result.has_failures());
    }

    #[test]
    fn test_parallel_mode() {
        assert_eq!(AnalysisMode::parallel(false), AnalysisMode::Parallel);
        assert_eq!(
            AnalysisMode::parallel(true),
            AnalysisMode::SlidingWindowParallel
        );
    }
}
