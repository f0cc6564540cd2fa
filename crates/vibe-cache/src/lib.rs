//! Embedded cache for extracted frames and analysis results.
//!
//! This crate provides:
//! - One record per video, keyed by metadata-derived [`VideoId`](vibe_models::VideoId)
//! - Capacity-bounded eviction of the oldest record
//! - Age-based expiry (lazy on read, eager on sweep)
//! - Persisted progress snapshots for orchestrated runs
//!
//! Records live in a single SQLite file; frame lists and analysis results are
//! stored as gzip-compressed JSON blobs.

pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod progress;
mod schema;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use store::{CacheStore, EntrySummary};
