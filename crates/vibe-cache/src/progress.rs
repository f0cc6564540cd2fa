//! Progress snapshots for orchestrated runs.
//!
//! Stored next to the video records so a caller can resume reporting after
//! a reload. Payloads are plain JSON; they are small and not worth gzipping.

use tracing::{debug, warn};

use vibe_models::ProgressRecord;

use crate::error::{CacheError, CacheResult};
use crate::store::CacheStore;

impl CacheStore {
    /// Upsert the progress snapshot for `record.task_id`.
    pub async fn save_progress(&self, record: &ProgressRecord) -> CacheResult<()> {
        let payload = serde_json::to_string(record)
            .map_err(|e| CacheError::serialization(format!("Failed to serialize progress: {}", e)))?;

        let _writing = self.write_lock().await;
        let pool = self.open().await?;
        sqlx::query(
            "INSERT INTO progress (task_id, payload, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(task_id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
        )
        .bind(&record.task_id)
        .bind(payload)
        .bind(self.now_ms())
        .execute(&pool)
        .await
        .map_err(|e| CacheError::write_failed(e.to_string()))?;

        debug!(
            task_id = %record.task_id,
            current = record.current,
            total = record.total,
            status = %record.status,
            "Saved progress"
        );
        Ok(())
    }

    /// Load the progress snapshot for a task, or `None` if absent or unreadable.
    pub async fn load_progress(&self, task_id: &str) -> Option<ProgressRecord> {
        match self.try_load_progress(task_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Failed to load progress");
                None
            }
        }
    }

    async fn try_load_progress(&self, task_id: &str) -> CacheResult<Option<ProgressRecord>> {
        let pool = self.open().await?;
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM progress WHERE task_id = ?")
                .bind(task_id)
                .fetch_optional(&pool)
                .await?;

        match payload {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| CacheError::serialization(format!("Corrupt progress record: {}", e))),
            None => Ok(None),
        }
    }
}
