//! Retry policy for frame requests.
//!
//! Two strategies:
//! - `Fixed`: the same delay after every failed attempt
//! - `Exponential`: `base * factor^(attempt - 1)` plus random jitter, capped

use std::time::Duration;

use rand::Rng;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    Fixed,
    Exponential,
}

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per frame, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Growth factor for exponential backoff.
    pub backoff_factor: f64,
    /// Upper bound of the uniform random jitter added to exponential delays.
    pub jitter: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            jitter: Duration::from_secs(1),
            strategy: BackoffStrategy::Fixed,
        }
    }
}

impl RetryPolicy {
    /// Default limits with exponential backoff and jitter.
    pub fn exponential() -> Self {
        Self {
            strategy: BackoffStrategy::Exponential,
            ..Default::default()
        }
    }

    /// Create config from environment variables, starting from `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = env_parse::<u32>("VIBE_RETRY_MAX_ATTEMPTS") {
            self.max_attempts = n.max(1);
        }
        if let Some(ms) = env_parse::<u64>("VIBE_RETRY_BASE_MS") {
            self.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("VIBE_RETRY_MAX_MS") {
            self.max_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("VIBE_RETRY_JITTER_MS") {
            self.jitter = Duration::from_millis(ms);
        }
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after `attempt` (1-based) has failed.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Exponential => {
                let backoff = self.backoff_without_jitter(attempt);
                let jitter_ms = self.jitter.as_millis() as u64;
                let jitter = if jitter_ms == 0 {
                    Duration::ZERO
                } else {
                    Duration::from_millis(rand::rng().random_range(0..jitter_ms))
                };
                (backoff + jitter).min(self.max_delay)
            }
        }
    }

    /// `min(max_delay, base * factor^(attempt - 1))`.
    fn backoff_without_jitter(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }
}

pub(crate) fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
