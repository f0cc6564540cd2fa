//! Cache configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default database file name.
pub const DEFAULT_DB_FILE: &str = "vibeenglish-cache.db";

/// Default maximum entry age (24 hours).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Default maximum number of cached videos.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Cache store configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Path of the SQLite database file
    pub db_path: PathBuf,
    /// Entries older than this are treated as absent
    pub max_age: Duration,
    /// Store-wide entry cap
    pub max_entries: usize,
    /// Pool size for the embedded database
    pub max_connections: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            max_age: DEFAULT_MAX_AGE,
            max_entries: DEFAULT_MAX_ENTRIES,
            max_connections: 4,
        }
    }
}

impl CacheConfig {
    /// Default configuration with the database at `path`.
    pub fn at_path(path: impl AsRef<Path>) -> Self {
        Self {
            db_path: path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            db_path: std::env::var("VIBE_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_FILE)),
            max_age: Duration::from_secs(
                std::env::var("VIBE_CACHE_MAX_AGE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MAX_AGE.as_secs()),
            ),
            max_entries: std::env::var("VIBE_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(DEFAULT_MAX_ENTRIES),
            max_connections: std::env::var("VIBE_CACHE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the entry cap. Zero is raised to one.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub(crate) fn max_age_ms(&self) -> i64 {
        self.max_age.as_millis().min(i64::MAX as u128) as i64
    }
}
