//! Batch request orchestrator.
//!
//! Frames are split into consecutive batches. Batches run one after
//! another; the frames inside a batch are requested concurrently and the
//! whole batch is awaited before the next one starts. Every input frame
//! yields exactly one [`NarrativeEntry`], in input order. A frame whose
//! retries are exhausted becomes a placeholder carrying the error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vibe_models::{AnalysisMode, AnalysisResult, ContextContinuity, FrameRecord, NarrativeEntry, Style};

use crate::client::{FrameAnalyzer, FrameRequest};
use crate::config::OrchestratorConfig;
use crate::error::{AnalysisError, AnalyzeResult};
use crate::metrics;
use crate::network::{adaptive_batch_size, FixedNetworkProbe, NetworkCondition, NetworkProbe};

/// Progress after a batch completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    /// Frames processed so far
    pub current: usize,
    pub total: usize,
    /// 1-based batch number
    pub batch: usize,
    pub batch_count: usize,
}

/// Callback invoked after each batch.
pub type ProgressFn = dyn Fn(ProgressUpdate) + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

/// Bookkeeping for one frame request during a run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchTask {
    pub task_id: String,
    pub frame_index: u32,
    pub attempts: u32,
    pub status: TaskStatus,
}

/// Aggregated result of a run.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// One entry per input frame, in input order
    pub results: Vec<NarrativeEntry>,
    /// Positions whose final attempt failed
    pub failed_indices: Vec<u32>,
    pub elapsed: Duration,
    /// Set when the run probed the network
    pub network_condition: Option<NetworkCondition>,
    pub batch_size: usize,
}

impl BatchOutcome {
    pub fn success_count(&self) -> usize {
        self.results.len() - self.failed_indices.len()
    }

    /// Video-level result for caching and display.
    pub fn into_analysis_result(self, style: Style, use_continuity: bool) -> AnalysisResult {
        AnalysisResult {
            total_frames: Some(self.results.len() as u32),
            video_narrative: self.results,
            mode: Some(AnalysisMode::parallel(use_continuity)),
            context_type: None,
            style: Some(style),
            failed_frames: self.failed_indices,
            processing_time_ms: Some(self.elapsed.as_millis() as u64),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStats {
    pub active_requests: usize,
    pub network_condition: NetworkCondition,
    pub adaptive_batch_size: usize,
}

/// Dispatches frame analysis requests in bounded concurrent batches.
pub struct BatchOrchestrator {
    config: OrchestratorConfig,
    analyzer: Arc<dyn FrameAnalyzer>,
    probe: Arc<dyn NetworkProbe>,
    tasks: Mutex<HashMap<String, BatchTask>>,
    cancel: Mutex<CancellationToken>,
    last_condition: Mutex<Option<NetworkCondition>>,
}

impl BatchOrchestrator {
    /// Orchestrator that never probes; adaptive runs see the default condition.
    pub fn new(config: OrchestratorConfig, analyzer: Arc<dyn FrameAnalyzer>) -> Self {
        Self::with_probe(config, analyzer, Arc::new(FixedNetworkProbe::default()))
    }

    pub fn with_probe(
        config: OrchestratorConfig,
        analyzer: Arc<dyn FrameAnalyzer>,
        probe: Arc<dyn NetworkProbe>,
    ) -> Self {
        Self {
            config,
            analyzer,
            probe,
            tasks: Mutex::new(HashMap::new()),
            cancel: Mutex::new(CancellationToken::new()),
            last_condition: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Analyze `frames` and return one entry per frame.
    ///
    /// Fails only with [`AnalysisError::InvalidInput`], before any request
    /// is made. Per-frame failures are reported in the outcome.
    pub async fn process_frames(
        &self,
        frames: &[FrameRecord],
        style: Style,
        use_continuity: bool,
        on_progress: Option<&(dyn Fn(ProgressUpdate) + Send + Sync + '_)>,
    ) -> AnalyzeResult<BatchOutcome> {
        validate_frames(frames)?;

        let started = Instant::now();
        let token = self.cancel.lock().await.clone();

        let (batch_size, network_condition) = if self.config.adaptive {
            let condition = self.probe.assess().await;
            *self.last_condition.lock().await = Some(condition);
            let size = adaptive_batch_size(&condition, self.config.min_batch, self.config.max_batch);
            info!(
                latency = ?condition.latency,
                bandwidth = ?condition.bandwidth,
                reliability = condition.reliability,
                batch_size = size,
                "Adaptive batch size selected"
            );
            (size, Some(condition))
        } else {
            (self.config.batch_size.max(1), None)
        };

        let inter_batch_delay = self.config.inter_batch_delay_for(network_condition.as_ref());
        let total = frames.len();
        let batch_count = total.div_ceil(batch_size);

        info!(
            frames = total,
            batches = batch_count,
            batch_size = batch_size,
            style = %style,
            use_continuity = use_continuity,
            "Starting batched frame analysis"
        );

        let mut results: Vec<NarrativeEntry> = Vec::with_capacity(total);
        let mut carried_sentence: Option<String> = None;

        for (batch_index, batch) in frames.chunks(batch_size).enumerate() {
            let batch_start = batch_index * batch_size;
            let batch_started = Instant::now();

            let requests = batch.iter().enumerate().map(|(offset, frame)| {
                let previous = if use_continuity && offset == 0 {
                    carried_sentence.clone()
                } else {
                    None
                };
                self.process_frame(frame, (batch_start + offset) as u32, style, use_continuity, previous, &token)
            });
            let batch_results = join_all(requests).await;

            if use_continuity {
                if let Some(last) = batch_results.iter().rev().find(|e| !e.sentence.is_empty()) {
                    carried_sentence = Some(last.sentence.clone());
                }
            }

            let failed = batch_results.iter().filter(|e| e.is_failed()).count();
            info!(
                batch = batch_index + 1,
                batches = batch_count,
                succeeded = batch_results.len() - failed,
                failed = failed,
                elapsed_ms = batch_started.elapsed().as_millis() as u64,
                "Batch complete"
            );
            results.extend(batch_results);

            if let Some(callback) = on_progress {
                callback(ProgressUpdate {
                    current: batch_start + batch.len(),
                    total,
                    batch: batch_index + 1,
                    batch_count,
                });
            }

            if batch_index + 1 < batch_count && !inter_batch_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(inter_batch_delay) => {}
                    _ = token.cancelled() => {}
                }
            }
        }

        let failed_indices: Vec<u32> = results
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_failed())
            .map(|(i, _)| i as u32)
            .collect();

        let elapsed = started.elapsed();
        info!(
            succeeded = total - failed_indices.len(),
            failed = failed_indices.len(),
            total = total,
            elapsed_ms = elapsed.as_millis() as u64,
            "Batched frame analysis complete"
        );

        Ok(BatchOutcome {
            results,
            failed_indices,
            elapsed,
            network_condition,
            batch_size,
        })
    }

    /// Run one frame through the retry loop. Never fails.
    async fn process_frame(
        &self,
        frame: &FrameRecord,
        position: u32,
        style: Style,
        use_continuity: bool,
        previous_sentence: Option<String>,
        token: &CancellationToken,
    ) -> NarrativeEntry {
        let task_id = format!("frame_{}_{}", position, Uuid::new_v4().simple());
        self.tasks.lock().await.insert(
            task_id.clone(),
            BatchTask {
                task_id: task_id.clone(),
                frame_index: position,
                attempts: 0,
                status: TaskStatus::Pending,
            },
        );

        let mut request = FrameRequest {
            frame: frame.payload_base64().to_string(),
            index: position,
            style,
            use_sliding_window: use_continuity,
            previous_sentence,
            task_id: task_id.clone(),
            attempt: 0,
        };

        let retry = &self.config.retry;
        let mut last_error = AnalysisError::request("Max retries exceeded");

        for attempt in 1..=retry.max_attempts {
            request.attempt = attempt;
            self.update_task(&task_id, attempt, TaskStatus::InFlight).await;

            let attempt_started = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => Err(AnalysisError::Cancelled),
                result = tokio::time::timeout(self.config.request_timeout, self.analyzer.analyze(&request)) => {
                    result.unwrap_or(Err(AnalysisError::Timeout(self.config.request_timeout)))
                }
            };
            let latency_ms = attempt_started.elapsed().as_secs_f64() * 1000.0;

            match outcome {
                Ok(mut entry) => {
                    metrics::record_request("success", latency_ms);
                    if entry.context_continuity.is_none() {
                        entry.context_continuity = request
                            .previous_sentence
                            .clone()
                            .map(|previous_sentence| ContextContinuity { previous_sentence });
                    }
                    debug!(
                        frame_index = position,
                        attempt = attempt,
                        latency_ms = latency_ms as u64,
                        "Frame analyzed"
                    );
                    self.finish_task(&task_id, attempt, TaskStatus::Succeeded).await;
                    return entry;
                }
                Err(AnalysisError::Cancelled) => {
                    last_error = AnalysisError::Cancelled;
                    break;
                }
                Err(e) => {
                    metrics::record_request(e.kind(), latency_ms);
                    warn!(
                        frame_index = position,
                        attempt = attempt,
                        error = %e,
                        "Frame analysis attempt failed"
                    );

                    let retryable = e.is_retryable();
                    last_error = e;
                    if !retryable || attempt == retry.max_attempts {
                        break;
                    }

                    let delay = retry.delay_for_attempt(attempt);
                    metrics::record_retry();
                    debug!(frame_index = position, delay_ms = delay.as_millis() as u64, "Retrying frame");

                    let cancelled = tokio::select! {
                        _ = tokio::time::sleep(delay) => false,
                        _ = token.cancelled() => true,
                    };
                    if cancelled {
                        last_error = AnalysisError::Cancelled;
                        break;
                    }
                }
            }
        }

        if matches!(last_error, AnalysisError::Cancelled) {
            debug!(frame_index = position, "Frame analysis cancelled");
        } else {
            warn!(
                frame_index = position,
                attempts = retry.max_attempts,
                error = %last_error,
                "Frame analysis failed after retries"
            );
        }
        metrics::record_failed_frame();
        self.finish_task(&task_id, request.attempt, TaskStatus::Failed).await;
        NarrativeEntry::placeholder(position, last_error.to_string())
    }

    async fn update_task(&self, task_id: &str, attempts: u32, status: TaskStatus) {
        if let Some(task) = self.tasks.lock().await.get_mut(task_id) {
            task.attempts = attempts;
            task.status = status;
        }
    }

    /// Terminal tasks leave the active map.
    async fn finish_task(&self, task_id: &str, attempts: u32, status: TaskStatus) {
        if let Some(task) = self.tasks.lock().await.remove(task_id) {
            debug!(
                task_id = %task.task_id,
                frame_index = task.frame_index,
                attempts = attempts,
                status = ?status,
                "Task finished"
            );
        }
    }

    /// Tasks of the current run that have not finished yet.
    pub async fn active_tasks(&self) -> Vec<BatchTask> {
        let mut tasks: Vec<BatchTask> = self.tasks.lock().await.values().cloned().collect();
        tasks.sort_by_key(|t| t.frame_index);
        tasks
    }

    pub async fn performance_stats(&self) -> PerformanceStats {
        let condition = self.last_condition.lock().await.unwrap_or_default();
        PerformanceStats {
            active_requests: self.tasks.lock().await.len(),
            network_condition: condition,
            adaptive_batch_size: adaptive_batch_size(
                &condition,
                self.config.min_batch,
                self.config.max_batch,
            ),
        }
    }

    /// Abort in-flight requests and pending retries, then reset bookkeeping.
    ///
    /// Frames of an interrupted run resolve to "cancelled" placeholders.
    /// Later runs use a fresh token.
    pub async fn cleanup(&self) {
        let mut token = self.cancel.lock().await;
        token.cancel();
        *token = CancellationToken::new();
        drop(token);

        let mut tasks = self.tasks.lock().await;
        for task_id in tasks.keys() {
            debug!(task_id = %task_id, "Cancelling request");
        }
        let cancelled = tasks.len();
        tasks.clear();
        info!(cancelled = cancelled, "Orchestrator cleaned up");
    }
}

fn validate_frames(frames: &[FrameRecord]) -> AnalyzeResult<()> {
    if frames.is_empty() {
        return Err(AnalysisError::invalid_input("Invalid frames input: empty frame list"));
    }
    if let Some(position) = frames.iter().position(|f| f.payload_base64().trim().is_empty()) {
        return Err(AnalysisError::invalid_input(format!(
            "Invalid frames input: frame {} has an empty payload",
            position
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::network::{BandwidthClass, LatencyClass};
    use crate::retry::RetryPolicy;

    /// Echoes the payload back as the sentence.
    struct EchoAnalyzer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FrameAnalyzer for EchoAnalyzer {
        async fn analyze(&self, request: &FrameRequest) -> AnalyzeResult<NarrativeEntry> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut entry = NarrativeEntry::placeholder(request.index, "");
            entry.error = None;
            entry.sentence = format!("sentence for {}", request.frame);
            Ok(entry)
        }
    }

    fn frames(n: usize) -> Vec<FrameRecord> {
        (0..n)
            .map(|i| FrameRecord::new(format!("frame_{}", i), i as u32, "00:00", format!("f{}", i)))
            .collect()
    }

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig {
            inter_batch_delay: Duration::ZERO,
            retry: RetryPolicy::default().with_base_delay(Duration::from_millis(1)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_rejects_empty_input() {
        let orchestrator = BatchOrchestrator::new(
            fast_config(),
            Arc::new(EchoAnalyzer { calls: AtomicUsize::new(0) }),
        );

        let err = orchestrator
            .process_frames(&[], Style::Casual, false, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));

        let blank = vec![FrameRecord::new("frame_0", 0, "00:00", "data:image/jpeg;base64,")];
        let err = orchestrator
            .process_frames(&blank, Style::Casual, false, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_batches_and_progress() {
        let analyzer = Arc::new(EchoAnalyzer { calls: AtomicUsize::new(0) });
        let orchestrator = BatchOrchestrator::new(fast_config(), analyzer.clone());

        let updates = std::sync::Mutex::new(Vec::new());
        let record = |u: ProgressUpdate| updates.lock().unwrap().push(u);

        let outcome = orchestrator
            .process_frames(&frames(12), Style::Beginner, false, Some(&record))
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 12);
        assert_eq!(outcome.batch_size, 5);
        assert!(outcome.failed_indices.is_empty());
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 12);

        let updates = updates.into_inner().unwrap();
        let progress: Vec<(usize, usize)> = updates.iter().map(|u| (u.current, u.batch)).collect();
        assert_eq!(progress, vec![(5, 1), (10, 2), (12, 3)]);
        assert!(updates.iter().all(|u| u.total == 12 && u.batch_count == 3));
    }

    #[tokio::test]
    async fn test_adaptive_batch_size_from_probe() {
        let probe = FixedNetworkProbe(NetworkCondition {
            latency: LatencyClass::Low,
            bandwidth: BandwidthClass::Fast,
            reliability: 1.0,
        });
        let config = OrchestratorConfig {
            inter_batch_delay: Duration::ZERO,
            ..OrchestratorConfig::enhanced()
        };
        let orchestrator = BatchOrchestrator::with_probe(
            config,
            Arc::new(EchoAnalyzer { calls: AtomicUsize::new(0) }),
            Arc::new(probe),
        );

        let outcome = orchestrator
            .process_frames(&frames(10), Style::Casual, false, None)
            .await
            .unwrap();
        assert_eq!(outcome.batch_size, 9);
        assert_eq!(outcome.network_condition.map(|c| c.latency), Some(LatencyClass::Low));

        let stats = orchestrator.performance_stats().await;
        assert_eq!(stats.active_requests, 0);
        assert_eq!(stats.adaptive_batch_size, 9);
    }

    #[tokio::test]
    async fn test_zero_adaptive_bounds_still_batch() {
        let config = OrchestratorConfig {
            min_batch: 0,
            max_batch: 0,
            inter_batch_delay: Duration::ZERO,
            ..OrchestratorConfig::enhanced()
        };
        let orchestrator = BatchOrchestrator::with_probe(
            config,
            Arc::new(EchoAnalyzer { calls: AtomicUsize::new(0) }),
            Arc::new(FixedNetworkProbe(NetworkCondition {
                latency: LatencyClass::Low,
                bandwidth: BandwidthClass::Fast,
                reliability: 1.0,
            })),
        );

        let outcome = orchestrator
            .process_frames(&frames(2), Style::Casual, false, None)
            .await
            .unwrap();
        assert_eq!(outcome.batch_size, 1);
        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.failed_indices.is_empty());
    }

    #[tokio::test]
    async fn test_into_analysis_result() {
        let orchestrator = BatchOrchestrator::new(
            fast_config(),
            Arc::new(EchoAnalyzer { calls: AtomicUsize::new(0) }),
        );
        let outcome = orchestrator
            .process_frames(&frames(2), Style::Literary, true, None)
            .await
            .unwrap();

        let result = outcome.into_analysis_result(Style::Literary, true);
        assert_eq!(result.mode, Some(AnalysisMode::SlidingWindowParallel));
        assert_eq!(result.total_frames, Some(2));
        assert_eq!(result.style, Some(Style::Literary));
        assert!(!result.has_failures());
    }
}
