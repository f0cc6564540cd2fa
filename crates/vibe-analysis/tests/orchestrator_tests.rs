//! End-to-end orchestrator behavior against a mock endpoint and scripted analyzers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vibe_analysis::{
    AnalysisError, AnalyzeResult, BatchOrchestrator, FrameAnalyzer, FrameRequest,
    HttpFrameAnalyzer, OrchestratorConfig, RetryPolicy,
};
use vibe_models::{FrameRecord, NarrativeEntry, Style};

fn frame(i: usize, payload: &str) -> FrameRecord {
    FrameRecord::new(
        format!("frame_{}", i),
        i as u32,
        "00:00",
        format!("data:image/jpeg;base64,{}", payload),
    )
}

fn test_config(batch_size: usize) -> OrchestratorConfig {
    OrchestratorConfig {
        batch_size,
        inter_batch_delay: Duration::from_millis(1),
        retry: RetryPolicy::default().with_base_delay(Duration::from_millis(5)),
        ..Default::default()
    }
}

fn narration(index: u32, sentence: &str) -> NarrativeEntry {
    NarrativeEntry {
        frame_index: index,
        timestamp: "00:00".to_string(),
        sentence: sentence.to_string(),
        advanced_vocabulary: Vec::new(),
        core_word: String::new(),
        vocabulary_count: 0,
        context_continuity: None,
        error: None,
    }
}

#[tokio::test]
async fn test_one_failing_frame_is_isolated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/analyze-frame"))
        .and(body_partial_json(serde_json::json!({"frame": "ZjE="})))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/analyze-frame"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {
                "frame_index": 0,
                "timestamp": "00:00",
                "sentence": "A person is cooking pasta.",
                "advanced_vocabulary": [],
                "core_word": "pasta",
                "vocabulary_count": 0
            }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let analyzer = HttpFrameAnalyzer::new(
        format!("{}/api/analyze-frame", server.uri()),
        Duration::from_secs(5),
    )
    .unwrap();
    let orchestrator = BatchOrchestrator::new(test_config(5), Arc::new(analyzer));

    let frames = vec![frame(0, "ZjA="), frame(1, "ZjE="), frame(2, "ZjI=")];
    let outcome = orchestrator
        .process_frames(&frames, Style::Casual, false, None)
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.failed_indices, vec![1]);
    assert_eq!(outcome.results[1].sentence, "");
    assert_eq!(
        outcome.results[1].error.as_deref(),
        Some("HTTP 500: Internal Server Error")
    );
    assert_eq!(outcome.results[0].sentence, "A person is cooking pasta.");
    assert_eq!(outcome.results[2].sentence, "A person is cooking pasta.");
    assert_eq!(outcome.success_count(), 2);
}

/// Completes later frames first.
struct ReverseLatencyAnalyzer;

#[async_trait]
impl FrameAnalyzer for ReverseLatencyAnalyzer {
    async fn analyze(&self, request: &FrameRequest) -> AnalyzeResult<NarrativeEntry> {
        tokio::time::sleep(Duration::from_millis(40 - 8 * request.index as u64)).await;
        Ok(narration(request.index, &format!("frame {}", request.index)))
    }
}

#[tokio::test]
async fn test_results_keep_input_order() {
    let orchestrator = BatchOrchestrator::new(test_config(5), Arc::new(ReverseLatencyAnalyzer));
    let frames: Vec<FrameRecord> = (0..5).map(|i| frame(i, "cGF5bG9hZA==")).collect();

    let outcome = orchestrator
        .process_frames(&frames, Style::Casual, false, None)
        .await
        .unwrap();

    let sentences: Vec<&str> = outcome.results.iter().map(|e| e.sentence.as_str()).collect();
    assert_eq!(sentences, vec!["frame 0", "frame 1", "frame 2", "frame 3", "frame 4"]);
}

/// Records the previous sentence each frame was sent with.
#[derive(Default)]
struct RecordingAnalyzer {
    seen: Mutex<HashMap<u32, Option<String>>>,
}

#[async_trait]
impl FrameAnalyzer for RecordingAnalyzer {
    async fn analyze(&self, request: &FrameRequest) -> AnalyzeResult<NarrativeEntry> {
        assert!(request.use_sliding_window);
        self.seen
            .lock()
            .unwrap()
            .insert(request.index, request.previous_sentence.clone());
        Ok(narration(request.index, &format!("sentence {}", request.index)))
    }
}

#[tokio::test]
async fn test_continuity_carries_across_batches() {
    let analyzer = Arc::new(RecordingAnalyzer::default());
    let orchestrator = BatchOrchestrator::new(test_config(2), analyzer.clone());
    let frames: Vec<FrameRecord> = (0..5).map(|i| frame(i, "cGF5bG9hZA==")).collect();

    let outcome = orchestrator
        .process_frames(&frames, Style::Literary, true, None)
        .await
        .unwrap();

    let seen = analyzer.seen.lock().unwrap().clone();
    assert_eq!(seen[&0], None);
    assert_eq!(seen[&1], None);
    assert_eq!(seen[&2].as_deref(), Some("sentence 1"));
    assert_eq!(seen[&3], None);
    assert_eq!(seen[&4].as_deref(), Some("sentence 3"));

    let continuity = outcome.results[2].context_continuity.as_ref().unwrap();
    assert_eq!(continuity.previous_sentence, "sentence 1");
}

/// Fails a fixed number of times before succeeding.
struct FlakyAnalyzer {
    failures_left: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl FrameAnalyzer for FlakyAnalyzer {
    async fn analyze(&self, request: &FrameRequest) -> AnalyzeResult<NarrativeEntry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(AnalysisError::rejected("temporarily overloaded"));
        }
        assert_eq!(request.attempt, 3);
        Ok(narration(request.index, "recovered"))
    }
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let analyzer = Arc::new(FlakyAnalyzer {
        failures_left: AtomicUsize::new(2),
        calls: AtomicUsize::new(0),
    });
    let orchestrator = BatchOrchestrator::new(test_config(5), analyzer.clone());

    let outcome = orchestrator
        .process_frames(&[frame(0, "cGF5bG9hZA==")], Style::Casual, false, None)
        .await
        .unwrap();

    assert!(outcome.failed_indices.is_empty());
    assert_eq!(outcome.results[0].sentence, "recovered");
    assert_eq!(analyzer.calls.load(Ordering::SeqCst), 3);
}

struct SlowAnalyzer(Duration);

#[async_trait]
impl FrameAnalyzer for SlowAnalyzer {
    async fn analyze(&self, request: &FrameRequest) -> AnalyzeResult<NarrativeEntry> {
        tokio::time::sleep(self.0).await;
        Ok(narration(request.index, "too late"))
    }
}

#[tokio::test]
async fn test_request_timeout_becomes_placeholder() {
    let config = OrchestratorConfig {
        request_timeout: Duration::from_millis(20),
        retry: RetryPolicy::default()
            .with_max_attempts(2)
            .with_base_delay(Duration::from_millis(1)),
        ..test_config(5)
    };
    let orchestrator =
        BatchOrchestrator::new(config, Arc::new(SlowAnalyzer(Duration::from_secs(5))));

    let outcome = orchestrator
        .process_frames(&[frame(0, "cGF5bG9hZA==")], Style::Casual, false, None)
        .await
        .unwrap();

    assert_eq!(outcome.failed_indices, vec![0]);
    let error = outcome.results[0].error.as_deref().unwrap();
    assert!(error.starts_with("Request timed out"), "unexpected error: {}", error);
}

#[tokio::test]
async fn test_cleanup_aborts_in_flight_requests() {
    let orchestrator = Arc::new(BatchOrchestrator::new(
        test_config(5),
        Arc::new(SlowAnalyzer(Duration::from_secs(30))),
    ));
    let frames: Vec<FrameRecord> = (0..3).map(|i| frame(i, "cGF5bG9hZA==")).collect();

    let running = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .process_frames(&frames, Style::Casual, false, None)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(orchestrator.active_tasks().await.len(), 3);

    orchestrator.cleanup().await;

    let outcome = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("run should stop promptly after cleanup")
        .unwrap()
        .unwrap();

    assert_eq!(outcome.failed_indices, vec![0, 1, 2]);
    assert!(outcome
        .results
        .iter()
        .all(|e| e.error.as_deref() == Some("cancelled")));
    assert_eq!(orchestrator.performance_stats().await.active_requests, 0);

    // A fresh run after cleanup is not affected by the old token
    let quick = BatchOrchestrator::new(test_config(5), Arc::new(SlowAnalyzer(Duration::ZERO)));
    quick.cleanup().await;
    let outcome = quick
        .process_frames(&[frame(0, "cGF5bG9hZA==")], Style::Casual, false, None)
        .await
        .unwrap();
    assert!(outcome.failed_indices.is_empty());
}
