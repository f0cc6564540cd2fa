//! Analysis metrics.
//!
//! - Request counters by outcome
//! - Per-request latency histogram
//! - Retry and failed-frame counters

use metrics::{counter, histogram};

pub mod names {
    /// Frame analysis requests by outcome ("success" or an error kind).
    pub const REQUESTS_TOTAL: &str = "analysis_requests_total";

    /// Retry attempts scheduled after a failed request.
    pub const RETRIES_TOTAL: &str = "analysis_retries_total";

    /// Frames that ended as placeholders.
    pub const FAILED_FRAMES_TOTAL: &str = "analysis_failed_frames_total";

    /// Latency of a single request attempt in seconds.
    pub const LATENCY_SECONDS: &str = "analysis_request_latency_seconds";
}

/// Record one finished request attempt.
pub fn record_request(status: &'static str, latency_ms: f64) {
    counter!(names::REQUESTS_TOTAL, "status" => status).increment(1);
    histogram!(names::LATENCY_SECONDS).record(latency_ms / 1000.0);
}

pub fn record_retry() {
    counter!(names::RETRIES_TOTAL).increment(1);
}

pub fn record_failed_frame() {
    counter!(names::FAILED_FRAMES_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.starts_with("analysis_"));
        assert!(names::RETRIES_TOTAL.contains("retries"));
        assert!(names::LATENCY_SECONDS.ends_with("_seconds"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("success", 12.0);
        record_retry();
        record_failed_frame();
    }
}
