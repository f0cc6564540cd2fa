//! Orchestrator configuration.

use std::time::Duration;

use crate::client::DEFAULT_REQUEST_TIMEOUT;
use crate::network::{LatencyClass, NetworkCondition};
use crate::retry::{env_parse, RetryPolicy};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Frames per batch when not adapting to the network
    pub batch_size: usize,
    /// Lower bound for adaptive batch size
    pub min_batch: usize,
    /// Upper bound for adaptive batch size
    pub max_batch: usize,
    /// Timeout for each individual request attempt
    pub request_timeout: Duration,
    /// Pause between consecutive batches
    pub inter_batch_delay: Duration,
    pub retry: RetryPolicy,
    /// Probe the network before each run and size batches from the result
    pub adaptive: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            min_batch: 3,
            max_batch: 10,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            inter_batch_delay: Duration::from_millis(500),
            retry: RetryPolicy::default(),
            adaptive: false,
        }
    }
}

impl OrchestratorConfig {
    /// Network-adaptive batching with exponential backoff and jitter.
    pub fn enhanced() -> Self {
        Self {
            retry: RetryPolicy::exponential(),
            adaptive: true,
            ..Default::default()
        }
    }

    /// Create config from environment variables.
    ///
    /// `VIBE_ADAPTIVE_BATCHING=true` selects [`OrchestratorConfig::enhanced`]
    /// as the base before individual overrides apply.
    pub fn from_env() -> Self {
        let adaptive = std::env::var("VIBE_ADAPTIVE_BATCHING")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let base = if adaptive { Self::enhanced() } else { Self::default() };

        let min_batch = env_parse("VIBE_MIN_BATCH").unwrap_or(base.min_batch).max(1);
        let max_batch = env_parse("VIBE_MAX_BATCH").unwrap_or(base.max_batch).max(min_batch);

        Self {
            batch_size: env_parse("VIBE_BATCH_SIZE").unwrap_or(base.batch_size).max(1),
            min_batch,
            max_batch,
            request_timeout: env_parse("VIBE_REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(base.request_timeout),
            inter_batch_delay: env_parse("VIBE_INTER_BATCH_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(base.inter_batch_delay),
            retry: base.retry.with_env_overrides(),
            adaptive,
        }
    }

    /// Pause between batches for a run.
    ///
    /// Adaptive runs back off to one second unless latency is low.
    pub fn inter_batch_delay_for(&self, condition: Option<&NetworkCondition>) -> Duration {
        match condition {
            Some(c) if self.adaptive => {
                if c.latency == LatencyClass::Low {
                    self.inter_batch_delay
                } else {
                    self.inter_batch_delay.max(Duration::from_secs(1))
                }
            }
            _ => self.inter_batch_delay,
        }
    }
}
