//! Persisted processing progress.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns true if the status is terminal (completed or failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of an orchestrated run, keyed by task id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub task_id: String,
    pub current: u32,
    pub total: u32,
    pub status: ProgressStatus,
    pub start_time_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_ms: Option<i64>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ProgressRecord {
    pub fn new(task_id: impl Into<String>, total: u32, start_time_ms: i64) -> Self {
        Self {
            task_id: task_id.into(),
            current: 0,
            total,
            status: ProgressStatus::Pending,
            start_time_ms,
            end_time_ms: None,
            errors: Vec::new(),
        }
    }

    /// Fraction of work done, in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.current as f64 / self.total as f64).min(1.0)
    }
}
