//! Video identity models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Cache key for a video, derived from file metadata.
///
/// Two distinct files sharing name, size and modification time map to the
/// same [`VideoId`]. Content is never hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoKey {
    /// File name (display name, without directories)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time in epoch milliseconds
    pub last_modified_ms: i64,
}

impl VideoKey {
    pub fn new(name: impl Into<String>, size: u64, last_modified_ms: i64) -> Self {
        Self {
            name: name.into(),
            size,
            last_modified_ms,
        }
    }

    /// Build a key from filesystem metadata.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let last_modified_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        Ok(Self::new(name, meta.len(), last_modified_ms))
    }

    /// Derive the primary key used by the cache store.
    pub fn video_id(&self) -> VideoId {
        VideoId(format!(
            "{}_{}_{}",
            self.name, self.size, self.last_modified_ms
        ))
    }
}

/// Primary key of a cached video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&VideoKey> for VideoId {
    fn from(key: &VideoKey) -> Self {
        key.video_id()
    }
}
