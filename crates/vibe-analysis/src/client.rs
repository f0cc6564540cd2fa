//! Frame analysis endpoint client.
//!
//! One request per frame:
//!
//! ```text
//! POST {endpoint}
//! X-Request-ID: <task id>
//! X-Attempt-Number: <1-based attempt>
//!
//! { "frame": "<base64>", "index": 0, "style": "casual",
//!   "useSlidingWindow": false, "previousSentence": "..." }
//! ```
//!
//! answered by `{ "success": true, "data": { ...narrative entry... } }` or
//! `{ "success": false, "error": "..." }`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vibe_models::{NarrativeEntry, Style};

use crate::error::{AnalysisError, AnalyzeResult};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body for a single frame analysis call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequest {
    /// Base64 image payload
    pub frame: String,
    pub index: u32,
    pub style: Style,
    pub use_sliding_window: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_sentence: Option<String>,
    /// Sent as `X-Request-ID`
    #[serde(skip)]
    pub task_id: String,
    /// Sent as `X-Attempt-Number`
    #[serde(skip)]
    pub attempt: u32,
}

#[derive(Debug, Deserialize)]
struct AnalyzeFrameResponse {
    success: bool,
    #[serde(default)]
    data: Option<NarrativeEntry>,
    #[serde(default)]
    error: Option<String>,
}

/// Narrates one frame.
#[async_trait]
pub trait FrameAnalyzer: Send + Sync {
    async fn analyze(&self, request: &FrameRequest) -> AnalyzeResult<NarrativeEntry>;
}

/// [`FrameAnalyzer`] over HTTP.
pub struct HttpFrameAnalyzer {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpFrameAnalyzer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> AnalyzeResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AnalysisError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    /// Client for `VIBE_ANALYSIS_URL`.
    pub fn from_env() -> AnalyzeResult<Self> {
        let endpoint = std::env::var("VIBE_ANALYSIS_URL")
            .map_err(|_| AnalysisError::config("VIBE_ANALYSIS_URL not set"))?;
        let timeout = std::env::var("VIBE_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Self::new(endpoint, timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl FrameAnalyzer for HttpFrameAnalyzer {
    async fn analyze(&self, request: &FrameRequest) -> AnalyzeResult<NarrativeEntry> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Request-ID", &request.task_id)
            .header("X-Attempt-Number", request.attempt.to_string())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Timeout(self.timeout)
                } else {
                    AnalysisError::request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
            return Err(AnalysisError::http_status(status.as_u16(), reason));
        }

        let body: AnalyzeFrameResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::invalid_response(e.to_string()))?;

        if !body.success {
            return Err(AnalysisError::rejected(
                body.error.unwrap_or_else(|| "Analysis failed".to_string()),
            ));
        }

        let entry = body
            .data
            .ok_or_else(|| AnalysisError::invalid_response("Missing data in successful response"))?;

        debug!(
            task_id = %request.task_id,
            frame_index = request.index,
            attempt = request.attempt,
            "Frame analyzed"
        );
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(index: u32) -> FrameRequest {
        FrameRequest {
            frame: "dGVzdA==".to_string(),
            index,
            style: Style::Casual,
            use_sliding_window: false,
            previous_sentence: None,
            task_id: format!("frame_{}_test", index),
            attempt: 1,
        }
    }

    fn success_body(index: u32, sentence: &str) -> serde_json::Value {
        serde_json::json!({
            "success": true,
            "data": {
                "frame_index": index,
                "timestamp": "00:00",
                "sentence": sentence,
                "advanced_vocabulary": [],
                "core_word": "cat",
                "vocabulary_count": 0
            }
        })
    }

    #[test]
    fn test_request_wire_format() {
        let mut req = request(2);
        req.previous_sentence = Some("A dog runs.".to_string());
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["useSlidingWindow"], false);
        assert_eq!(json["previousSentence"], "A dog runs.");
        assert_eq!(json["style"], "casual");
        assert!(json.get("taskId").is_none());
        assert!(json.get("task_id").is_none());

        let json = serde_json::to_value(request(0)).unwrap();
        assert!(json.get("previousSentence").is_none());
    }

    #[tokio::test]
    async fn test_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/analyze-frame"))
            .and(header("X-Request-ID", "frame_0_test"))
            .and(header("X-Attempt-Number", "1"))
            .and(body_partial_json(serde_json::json!({"index": 0, "frame": "dGVzdA=="})))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body(0, "A cat sleeps.")))
            .expect(1)
            .mount(&server)
            .await;

        let analyzer = HttpFrameAnalyzer::new(
            format!("{}/api/analyze-frame", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();

        let entry = analyzer.analyze(&request(0)).await.unwrap();
        assert_eq!(entry.sentence, "A cat sleeps.");
        assert_eq!(entry.core_word, "cat");
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let analyzer = HttpFrameAnalyzer::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = analyzer.analyze(&request(0)).await.unwrap_err();
        assert!(matches!(err, AnalysisError::HttpStatus { status: 500, .. }));
        assert_eq!(err.to_string(), "HTTP 500: Internal Server Error");
    }

    #[tokio::test]
    async fn test_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"success": false, "error": "quota"})),
            )
            .mount(&server)
            .await;

        let analyzer = HttpFrameAnalyzer::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = analyzer.analyze(&request(0)).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Rejected(ref m) if m == "quota"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(success_body(0, "late"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let analyzer = HttpFrameAnalyzer::new(server.uri(), Duration::from_millis(200)).unwrap();
        let err = analyzer.analyze(&request(0)).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Timeout(_)));
    }
}
