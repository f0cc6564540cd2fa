//! Cache store over an embedded SQLite database.
//!
//! Every public operation opens the connection on demand, so `close()` or
//! `clear_all()` followed by any other call transparently reinitializes.
//!
//! # Failure policy
//!
//! - `open`: [`CacheError::StorageUnavailable`]
//! - `save_frames` / `save_analysis_result`: typed error, the write is lost
//! - every read and cleanup path: logged, normalized to "nothing found"
//!
//! Writers on one store are serialized. SQLite allows a single writer, and a
//! deferred transaction that reads before writing cannot wait for the lock.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use vibe_models::{AnalysisResult, CacheEntry, FrameRecord, VideoId, VideoKey};

use crate::clock::{Clock, SystemClock};
use crate::codec::{decode_json, encode_json};
use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::schema::{SCHEMA, SELECT_ENTRY, SELECT_OLDEST};

/// Lightweight listing row (no payloads).
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySummary {
    pub video_id: VideoId,
    pub video_name: String,
    pub frame_count: u32,
    pub has_analysis: bool,
    pub timestamp: i64,
}

/// Capacity- and age-bounded store of per-video frames and analysis results.
///
/// Each instance owns its own connection pool. Two instances pointed at the
/// same file are not coordinated: a `clear_all` on one while the other is
/// open is a race the caller must avoid.
pub struct CacheStore {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    pool: Mutex<Option<SqlitePool>>,
    writes: Mutex<()>,
}

impl CacheStore {
    /// Create a store using the wall clock. No I/O happens until first use.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            pool: Mutex::new(None),
            writes: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Open the database and apply the schema.
    ///
    /// Idempotent: repeated or concurrent calls share one pool and never
    /// duplicate tables or indexes.
    pub async fn open(&self) -> CacheResult<SqlitePool> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let path = &self.config.db_path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CacheError::storage_unavailable(format!(
                    "Cannot create cache directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(self.config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::storage_unavailable(format!(
                    "Failed to open cache database {}: {}",
                    path.display(),
                    e
                ))
            })?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await.map_err(|e| {
                CacheError::storage_unavailable(format!("Failed to apply cache schema: {}", e))
            })?;
        }

        info!(path = %path.display(), "Cache database opened");
        *guard = Some(pool.clone());
        Ok(pool)
    }

    /// Release the connection. The next operation reopens it.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.close().await;
            debug!("Cache database closed");
        }
    }

    /// Destroy the whole store, including progress records.
    ///
    /// The database file is deleted; the next operation recreates it empty.
    pub async fn clear_all(&self) -> CacheResult<()> {
        let _writing = self.write_lock().await;
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.take() {
            pool.close().await;
        }

        for path in self.database_files() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed cache file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::Io(e)),
            }
        }

        info!("All cache cleared");
        Ok(())
    }

    fn database_files(&self) -> Vec<PathBuf> {
        let base = self.config.db_path.as_os_str();
        ["", "-wal", "-shm"]
            .iter()
            .map(|suffix| {
                let mut name = base.to_os_string();
                name.push(suffix);
                PathBuf::from(name)
            })
            .collect()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Cache extracted frames for a video.
    ///
    /// Sweeps expired entries, evicts the oldest entry when a new id would
    /// exceed the cap, then upserts. An existing analysis result is kept.
    pub async fn save_frames(
        &self,
        key: &VideoKey,
        frames: &[FrameRecord],
        duration: f64,
    ) -> CacheResult<()> {
        let video_id = key.video_id();
        let payload = encode_json(&frames)?;

        self.clean_expired_cache().await;

        let _writing = self.write_lock().await;
        let pool = self.open().await?;
        let mut tx = pool.begin().await.map_err(write_failed)?;
        let existing = self.live_timestamp(&mut tx, &video_id).await?;

        if existing.is_none() {
            self.make_room(&mut tx).await?;
        }

        let timestamp = self.refreshed_timestamp(existing);
        sqlx::query(
            "INSERT INTO videos (video_id, video_name, frames, analysis_result, timestamp, duration, frame_count) \
             VALUES (?, ?, ?, NULL, ?, ?, ?) \
             ON CONFLICT(video_id) DO UPDATE SET \
                video_name = excluded.video_name, \
                frames = excluded.frames, \
                timestamp = excluded.timestamp, \
                duration = excluded.duration, \
                frame_count = excluded.frame_count",
        )
        .bind(video_id.as_str())
        .bind(&key.name)
        .bind(payload)
        .bind(timestamp)
        .bind(duration)
        .bind(frames.len() as i64)
        .execute(&mut *tx)
        .await
        .map_err(write_failed)?;

        tx.commit().await.map_err(write_failed)?;

        info!(
            video_id = %video_id,
            frame_count = frames.len(),
            "Frames cached"
        );
        Ok(())
    }

    /// Cache an analysis result for a video.
    ///
    /// Frames already cached for the video are kept. A new entry with no
    /// frames is created when none exists or the existing one has expired.
    pub async fn save_analysis_result(
        &self,
        key: &VideoKey,
        result: &AnalysisResult,
    ) -> CacheResult<()> {
        let video_id = key.video_id();
        let payload = encode_json(result)?;
        let empty_frames = encode_json(&Vec::<FrameRecord>::new())?;

        let _writing = self.write_lock().await;
        let pool = self.open().await?;
        let mut tx = pool.begin().await.map_err(write_failed)?;
        let existing = self.live_timestamp(&mut tx, &video_id).await?;

        if existing.is_none() {
            self.make_room(&mut tx).await?;
        }

        let timestamp = self.refreshed_timestamp(existing);
        sqlx::query(
            "INSERT INTO videos (video_id, video_name, frames, analysis_result, timestamp, duration, frame_count) \
             VALUES (?, ?, ?, ?, ?, 0, 0) \
             ON CONFLICT(video_id) DO UPDATE SET \
                analysis_result = excluded.analysis_result, \
                timestamp = excluded.timestamp",
        )
        .bind(video_id.as_str())
        .bind(&key.name)
        .bind(empty_frames)
        .bind(payload)
        .bind(timestamp)
        .execute(&mut *tx)
        .await
        .map_err(write_failed)?;

        tx.commit().await.map_err(write_failed)?;

        if existing.is_some() {
            info!(video_id = %video_id, "Analysis result updated in cache");
        } else {
            info!(video_id = %video_id, "Analysis result cached (new entry)");
        }
        Ok(())
    }

    pub(crate) async fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().await
    }

    /// Timestamp of the stored entry for `video_id`.
    ///
    /// An expired entry is deleted inside the transaction and reported absent.
    async fn live_timestamp(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        video_id: &VideoId,
    ) -> CacheResult<Option<i64>> {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT timestamp FROM videos WHERE video_id = ?")
                .bind(video_id.as_str())
                .fetch_optional(&mut **tx)
                .await
                .map_err(write_failed)?;

        match existing {
            Some(timestamp) if timestamp < self.expiry_threshold() => {
                sqlx::query("DELETE FROM videos WHERE video_id = ?")
                    .bind(video_id.as_str())
                    .execute(&mut **tx)
                    .await
                    .map_err(write_failed)?;
                info!(video_id = %video_id, "Replacing expired cache entry");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn expiry_threshold(&self) -> i64 {
        self.clock.now_ms().saturating_sub(self.config.max_age_ms())
    }

    /// Evict oldest entries until one more insert fits under the cap.
    async fn make_room(&self, tx: &mut Transaction<'_, Sqlite>) -> CacheResult<()> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos")
            .fetch_one(&mut **tx)
            .await
            .map_err(write_failed)?;

        let overflow = count - self.config.max_entries as i64 + 1;
        if overflow <= 0 {
            return Ok(());
        }

        let victims: Vec<String> = sqlx::query_scalar(SELECT_OLDEST)
            .bind(overflow)
            .fetch_all(&mut **tx)
            .await
            .map_err(write_failed)?;

        for victim in victims {
            sqlx::query("DELETE FROM videos WHERE video_id = ?")
                .bind(&victim)
                .execute(&mut **tx)
                .await
                .map_err(write_failed)?;
            info!(video_id = %victim, "Evicted oldest cache entry");
        }
        Ok(())
    }

    /// Never move an entry's timestamp backwards.
    fn refreshed_timestamp(&self, existing: Option<i64>) -> i64 {
        let now = self.clock.now_ms();
        existing.map_or(now, |previous| previous.max(now))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Cached frames for a video, or `None` on miss or expiry.
    pub async fn get_frames(&self, key: &VideoKey) -> Option<Vec<FrameRecord>> {
        let entry = self.get_entry(key).await?;
        debug!(
            video_id = %entry.video_id,
            age_secs = entry.age(self.clock.now_ms()).as_secs(),
            "Frame cache hit"
        );
        Some(entry.frames)
    }

    /// Cached analysis result for a video, or `None` on miss or expiry.
    pub async fn get_analysis_result(&self, key: &VideoKey) -> Option<AnalysisResult> {
        let result = self.get_entry(key).await?.analysis_result;
        if result.is_none() {
            debug!(video = %key.name, "No cached analysis result");
        }
        result
    }

    /// Whole cached record. Expired records are deleted and reported absent.
    pub async fn get_entry(&self, key: &VideoKey) -> Option<CacheEntry> {
        let video_id = key.video_id();
        match self.load_entry(&video_id).await {
            Ok(Some(entry)) if entry.is_expired(self.clock.now_ms(), self.config.max_age) => {
                info!(video_id = %video_id, "Cache entry expired, removing");
                self.delete_entry(&video_id).await;
                None
            }
            Ok(Some(entry)) => Some(entry),
            Ok(None) => {
                debug!(video_id = %video_id, "Cache miss");
                None
            }
            Err(e) => {
                warn!(video_id = %video_id, error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn load_entry(&self, video_id: &VideoId) -> CacheResult<Option<CacheEntry>> {
        let pool = self.open().await?;
        let row = sqlx::query(SELECT_ENTRY)
            .bind(video_id.as_str())
            .fetch_optional(&pool)
            .await?;

        match row {
            Some(row) => decode_entry(&row),
            None => Ok(None),
        }
    }

    /// Number of stored entries, expired ones included.
    pub async fn count(&self) -> u64 {
        match self.try_count().await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Failed to count cache entries");
                0
            }
        }
    }

    async fn try_count(&self) -> CacheResult<u64> {
        let pool = self.open().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos")
            .fetch_one(&pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Summaries of all stored entries, oldest first.
    pub async fn entries(&self) -> Vec<EntrySummary> {
        self.try_entries().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to list cache entries");
            Vec::new()
        })
    }

    async fn try_entries(&self) -> CacheResult<Vec<EntrySummary>> {
        let pool = self.open().await?;
        let rows = sqlx::query(
            "SELECT video_id, video_name, frame_count, \
             CASE WHEN analysis_result IS NULL THEN 0 ELSE 1 END AS has_analysis, timestamp \
             FROM videos ORDER BY timestamp ASC, rowid ASC",
        )
        .fetch_all(&pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            summaries.push(EntrySummary {
                video_id: VideoId(row.try_get("video_id")?),
                video_name: row.try_get("video_name")?,
                frame_count: row.try_get::<i64, _>("frame_count")?.max(0) as u32,
                has_analysis: row.try_get::<i64, _>("has_analysis")? != 0,
                timestamp: row.try_get("timestamp")?,
            });
        }
        Ok(summaries)
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    /// Remove one entry. Missing ids and storage errors are ignored.
    pub async fn delete_entry(&self, video_id: &VideoId) {
        match self.try_delete(video_id).await {
            Ok(0) => {}
            Ok(_) => debug!(video_id = %video_id, "Cache entry deleted"),
            Err(e) => warn!(video_id = %video_id, error = %e, "Failed to delete cache entry"),
        }
    }

    async fn try_delete(&self, video_id: &VideoId) -> CacheResult<u64> {
        let _writing = self.write_lock().await;
        let pool = self.open().await?;
        let done = sqlx::query("DELETE FROM videos WHERE video_id = ?")
            .bind(video_id.as_str())
            .execute(&pool)
            .await?;
        Ok(done.rows_affected())
    }

    /// Delete every entry older than the configured max age.
    ///
    /// Returns the number removed; errors count as zero.
    pub async fn clean_expired_cache(&self) -> u64 {
        match self.try_clean_expired().await {
            Ok(0) => 0,
            Ok(removed) => {
                info!(removed = removed, "Cleaned expired cache entries");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Failed to clean expired cache");
                0
            }
        }
    }

    async fn try_clean_expired(&self) -> CacheResult<u64> {
        let _writing = self.write_lock().await;
        let pool = self.open().await?;
        let threshold = self.expiry_threshold();
        let done = sqlx::query("DELETE FROM videos WHERE timestamp < ?")
            .bind(threshold)
            .execute(&pool)
            .await?;
        Ok(done.rows_affected())
    }

    /// Remove the entry with the smallest timestamp, if any.
    pub async fn remove_oldest_entry(&self) -> Option<VideoId> {
        match self.try_remove_oldest().await {
            Ok(Some(id)) => {
                info!(video_id = %id, "Removed oldest cache entry");
                Some(id)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to remove oldest cache entry");
                None
            }
        }
    }

    async fn try_remove_oldest(&self) -> CacheResult<Option<VideoId>> {
        let _writing = self.write_lock().await;
        let pool = self.open().await?;
        let mut tx = pool.begin().await?;
        let oldest: Option<String> = sqlx::query_scalar(SELECT_OLDEST)
            .bind(1_i64)
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(id) = &oldest {
            sqlx::query("DELETE FROM videos WHERE video_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(oldest.map(VideoId))
    }

    pub(crate) fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}

fn write_failed(e: sqlx::Error) -> CacheError {
    CacheError::write_failed(e.to_string())
}

fn decode_entry(row: &SqliteRow) -> CacheResult<Option<CacheEntry>> {
    let video_id = VideoId(row.try_get("video_id")?);
    let frames_blob: Vec<u8> = row.try_get("frames")?;
    let analysis_blob: Option<Vec<u8>> = row.try_get("analysis_result")?;

    let Some(frames) = decode_json::<Vec<FrameRecord>>(&frames_blob) else {
        warn!(video_id = %video_id, "Unreadable cached frames, treating as miss");
        return Ok(None);
    };

    let analysis_result = match analysis_blob {
        Some(blob) => match decode_json::<AnalysisResult>(&blob) {
            Some(result) => Some(result),
            None => {
                warn!(video_id = %video_id, "Unreadable cached analysis result, ignoring it");
                None
            }
        },
        None => None,
    };

    Ok(Some(CacheEntry {
        video_id,
        video_name: row.try_get("video_name")?,
        frames,
        analysis_result,
        timestamp: row.try_get("timestamp")?,
        duration: row.try_get("duration")?,
        frame_count: row.try_get::<i64, _>("frame_count")?.max(0) as u32,
    }))
}
