//! Database schema.

/// Statements applied on every open. All are idempotent.
pub(crate) const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS videos (
        video_id        TEXT PRIMARY KEY NOT NULL,
        video_name      TEXT NOT NULL,
        frames          BLOB NOT NULL,
        analysis_result BLOB,
        timestamp       INTEGER NOT NULL,
        duration        REAL NOT NULL DEFAULT 0,
        frame_count     INTEGER NOT NULL DEFAULT 0
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_videos_timestamp ON videos (timestamp ASC)",
    r#"CREATE TABLE IF NOT EXISTS progress (
        task_id    TEXT PRIMARY KEY NOT NULL,
        payload    TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )"#,
];

pub(crate) const SELECT_ENTRY: &str = "SELECT video_id, video_name, frames, analysis_result, \
     timestamp, duration, frame_count FROM videos WHERE video_id = ?";

/// Oldest first; ties resolve in insertion order.
pub(crate) const SELECT_OLDEST: &str =
    "SELECT video_id FROM videos ORDER BY timestamp ASC, rowid ASC LIMIT ?";
