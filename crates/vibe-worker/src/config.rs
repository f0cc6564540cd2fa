//! Worker configuration.

use std::net::SocketAddr;

use vibe_analysis::OrchestratorConfig;
use vibe_cache::CacheConfig;
use vibe_models::DEFAULT_FRAME_INTERVAL_SECS;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Frames beyond this count are not sent for analysis
    pub max_frames: usize,
    /// Seconds between extracted frames, used for time markers
    pub frame_interval_secs: u32,
    /// Prometheus listener; metrics are not exported when unset
    pub metrics_addr: Option<SocketAddr>,
    pub cache: CacheConfig,
    pub orchestrator: OrchestratorConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_frames: 50,
            frame_interval_secs: DEFAULT_FRAME_INTERVAL_SECS,
            metrics_addr: None,
            cache: CacheConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_frames: std::env::var("VIBE_MAX_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(50),
            frame_interval_secs: std::env::var("VIBE_FRAME_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(DEFAULT_FRAME_INTERVAL_SECS),
            metrics_addr: std::env::var("VIBE_METRICS_ADDR")
                .ok()
                .and_then(|s| s.parse().ok()),
            cache: CacheConfig::from_env(),
            orchestrator: OrchestratorConfig::from_env(),
        }
    }
}
