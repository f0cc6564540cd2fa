//! Cached per-video record.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analysis::AnalysisResult;
use crate::frame::FrameRecord;
use crate::video::VideoId;

/// One persisted record per [`VideoId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub video_id: VideoId,
    /// Display only
    pub video_name: String,
    pub frames: Vec<FrameRecord>,
    pub analysis_result: Option<AnalysisResult>,
    /// Last write time, epoch milliseconds
    pub timestamp: i64,
    /// Source video duration in seconds
    pub duration: f64,
    pub frame_count: u32,
}

impl CacheEntry {
    /// Age of the entry relative to `now_ms`. Future timestamps count as zero.
    pub fn age(&self, now_ms: i64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.timestamp).max(0) as u64)
    }

    pub fn is_expired(&self, now_ms: i64, max_age: Duration) -> bool {
        self.age(now_ms) > max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::VideoKey;

    fn entry(timestamp: i64) -> CacheEntry {
        let key = VideoKey::new("talk.mp4", 2048, 42);
        CacheEntry {
            video_id: key.video_id(),
            video_name: key.name,
            frames: Vec::new(),
            analysis_result: None,
            timestamp,
            duration: 0.0,
            frame_count: 0,
        }
    }

    #[test]
    fn test_age_ignores_future_timestamps() {
        assert_eq!(entry(1_000).age(3_500), Duration::from_millis(2_500));
        assert_eq!(entry(1_000).age(0), Duration::ZERO);
    }

    #[test]
    fn test_expiry_is_strict() {
        let entry = entry(1_000);
        let max_age = Duration::from_millis(500);
        assert!(!entry.is_expired(1_500, max_age));
        assert!(entry.is_expired(1_501, max_age));
        assert!(!entry.is_expired(0, max_age));
    }
}
