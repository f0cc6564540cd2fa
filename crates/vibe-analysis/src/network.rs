//! Network condition estimation and adaptive batch sizing.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

/// Default endpoint for the timing round-trip.
pub const DEFAULT_PROBE_URL: &str = "https://httpbin.org/post";

/// Round-trip timeout for the probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyClass {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BandwidthClass {
    Slow,
    Medium,
    Fast,
}

/// Estimated network quality towards the analysis endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NetworkCondition {
    pub latency: LatencyClass,
    pub bandwidth: BandwidthClass,
    /// 0.0 to 1.0
    pub reliability: f64,
}

impl Default for NetworkCondition {
    fn default() -> Self {
        Self {
            latency: LatencyClass::Medium,
            bandwidth: BandwidthClass::Medium,
            reliability: 1.0,
        }
    }
}

impl NetworkCondition {
    /// Classify a completed probe round-trip.
    pub fn from_round_trip(elapsed: Duration, success: bool) -> Self {
        let (latency, bandwidth) = if elapsed < Duration::from_millis(500) {
            (LatencyClass::Low, BandwidthClass::Fast)
        } else if elapsed < Duration::from_millis(1500) {
            (LatencyClass::Medium, BandwidthClass::Medium)
        } else {
            (LatencyClass::High, BandwidthClass::Slow)
        };

        Self {
            latency,
            bandwidth,
            reliability: if success { 1.0 } else { 0.5 },
        }
    }

    /// Condition assumed when the probe itself failed.
    pub fn unreachable() -> Self {
        Self {
            latency: LatencyClass::High,
            bandwidth: BandwidthClass::Slow,
            reliability: 0.3,
        }
    }
}

/// Batch size for `condition`, clamped to `[min, max]` and never below 1.
pub fn adaptive_batch_size(condition: &NetworkCondition, min: usize, max: usize) -> usize {
    let mut size = min as i64;

    size += match condition.latency {
        LatencyClass::Low => 4,
        LatencyClass::Medium => 2,
        LatencyClass::High => 0,
    };

    size += match condition.bandwidth {
        BandwidthClass::Fast => 2,
        BandwidthClass::Medium => 0,
        BandwidthClass::Slow => -1,
    };

    let scaled = (size as f64 * condition.reliability.clamp(0.0, 1.0)).floor() as i64;
    (scaled.max(0) as usize).min(max).max(min).max(1)
}

/// Strategy for estimating the current network condition.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn assess(&self) -> NetworkCondition;
}

/// Probe timing a single POST round-trip.
pub struct HttpNetworkProbe {
    client: Client,
    url: String,
}

impl HttpNetworkProbe {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build probe HTTP client, using defaults");
                Client::new()
            });

        Self {
            client,
            url: url.into(),
        }
    }

    /// Probe against `VIBE_PROBE_URL` or [`DEFAULT_PROBE_URL`].
    pub fn from_env() -> Self {
        Self::new(std::env::var("VIBE_PROBE_URL").unwrap_or_else(|_| DEFAULT_PROBE_URL.to_string()))
    }
}

#[async_trait]
impl NetworkProbe for HttpNetworkProbe {
    async fn assess(&self) -> NetworkCondition {
        let started = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .timeout(PROBE_TIMEOUT)
            .json(&serde_json::json!({ "test": "ping" }))
            .send()
            .await;

        match response {
            Ok(resp) => {
                let elapsed = started.elapsed();
                let condition = NetworkCondition::from_round_trip(elapsed, resp.status().is_success());
                info!(
                    latency_ms = elapsed.as_millis() as u64,
                    latency = ?condition.latency,
                    reliability = condition.reliability,
                    "Network assessed"
                );
                condition
            }
            Err(e) => {
                warn!(error = %e, "Network assessment failed");
                NetworkCondition::unreachable()
            }
        }
    }
}

/// Probe that always reports the same condition.
#[derive(Debug, Clone, Default)]
pub struct FixedNetworkProbe(pub NetworkCondition);

#[async_trait]
impl NetworkProbe for FixedNetworkProbe {
    async fn assess(&self) -> NetworkCondition {
        self.0
    }
}
