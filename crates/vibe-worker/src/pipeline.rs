//! Cache-first subtitle narration pipeline.
//!
//! A cached analysis result short-circuits the run. Otherwise frames are
//! cached, analyzed in batches and a complete result is written back. Cache writes
//! never abort a run; a failing store only costs the reuse.

use std::sync::Arc;

use vibe_analysis::{BatchOrchestrator, ProgressUpdate};
use vibe_cache::CacheStore;
use vibe_models::{AnalysisResult, FrameRecord, Style, VideoKey};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::RunLogger;

/// Default cap on frames sent for analysis.
pub const DEFAULT_MAX_FRAMES: usize = 50;

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub result: AnalysisResult,
    /// True when the result was served from the cache without analysis
    pub from_cache: bool,
}

pub struct SubtitlePipeline {
    cache: Arc<CacheStore>,
    orchestrator: BatchOrchestrator,
    max_frames: usize,
}

impl SubtitlePipeline {
    pub fn new(cache: Arc<CacheStore>, orchestrator: BatchOrchestrator) -> Self {
        Self {
            cache,
            orchestrator,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn orchestrator(&self) -> &BatchOrchestrator {
        &self.orchestrator
    }

    /// Frames cached for `video`, letting callers skip extraction.
    pub async fn cached_frames(&self, video: &VideoKey) -> Option<Vec<FrameRecord>> {
        self.cache.get_frames(video).await
    }

    /// Narrate a video, reusing a cached result when one exists.
    pub async fn run(
        &self,
        video: &VideoKey,
        frames: &[FrameRecord],
        duration: f64,
        style: Style,
        use_continuity: bool,
    ) -> WorkerResult<PipelineOutput> {
        let logger = RunLogger::new(&video.video_id(), "narrate");

        if let Some(result) = self.cache.get_analysis_result(video).await {
            logger.log_completion("served from cache");
            return Ok(PipelineOutput {
                result,
                from_cache: true,
            });
        }

        if frames.is_empty() {
            return Err(WorkerError::invalid_input("No frames to analyze"));
        }

        logger.log_start(&format!(
            "{} frames, style={}, continuity={}",
            frames.len(),
            style,
            use_continuity
        ));

        if let Err(e) = self.cache.save_frames(video, frames, duration).await {
            logger.log_warning(&format!("failed to cache frames: {}", e));
        }

        let selected = &frames[..frames.len().min(self.max_frames)];
        if selected.len() < frames.len() {
            logger.log_progress(&format!(
                "analyzing first {} of {} frames",
                selected.len(),
                frames.len()
            ));
        }

        let report = |update: ProgressUpdate| {
            logger.log_progress(&format!(
                "batch {}/{} ({}/{} frames)",
                update.batch, update.batch_count, update.current, update.total
            ));
        };

        let outcome = match self
            .orchestrator
            .process_frames(selected, style, use_continuity, Some(&report))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                logger.log_error(&e.to_string());
                return Err(e.into());
            }
        };

        if !outcome.failed_indices.is_empty() {
            logger.log_warning(&format!(
                "{} of {} frames failed: {:?}",
                outcome.failed_indices.len(),
                outcome.results.len(),
                outcome.failed_indices
            ));
        }

        let result = outcome.into_analysis_result(style, use_continuity);

        // Partial results are returned but never cached
        if result.has_failures() {
            logger.log_warning("result has failed frames, not caching it");
        } else if let Err(e) = self.cache.save_analysis_result(video, &result).await {
            logger.log_warning(&format!("failed to cache analysis result: {}", e));
        }

        logger.log_completion(&format!(
            "{} narrative entries in {} ms",
            result.video_narrative.len(),
            result.processing_time_ms.unwrap_or_default()
        ));

        Ok(PipelineOutput {
            result,
            from_cache: false,
        })
    }
}
