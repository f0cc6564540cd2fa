//! Loading extracted frames from a directory.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use vibe_models::{frame_timestamp, FrameRecord};

use crate::error::{WorkerError, WorkerResult};

/// Image MIME type for a supported frame file, by extension.
fn frame_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// Read every JPEG/PNG in `dir`, in file name order, as data-URL frames.
///
/// Frame `i` gets id `frame_{i+1}` and the time marker for
/// `i * interval_secs`.
pub async fn load_frames_dir(dir: &Path, interval_secs: u32) -> WorkerResult<Vec<FrameRecord>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths: Vec<(PathBuf, &'static str)> = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(mime) = frame_mime(&path) {
            paths.push((path, mime));
        }
    }

    if paths.is_empty() {
        return Err(WorkerError::invalid_input(format!(
            "No .jpg/.jpeg/.png frames in {}",
            dir.display()
        )));
    }

    paths.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));

    let mut frames = Vec::with_capacity(paths.len());
    for (i, (path, mime)) in paths.into_iter().enumerate() {
        let bytes = tokio::fs::read(&path).await?;
        let index = i as u32;
        frames.push(FrameRecord::new(
            format!("frame_{}", index + 1),
            index,
            frame_timestamp(index, interval_secs),
            format!("data:{};base64,{}", mime, STANDARD.encode(&bytes)),
        ));
    }

    debug!(dir = %dir.display(), count = frames.len(), "Loaded frames");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loads_images_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("002.png"), b"second").unwrap();
        std::fs::write(dir.path().join("001.jpg"), b"first").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let frames = load_frames_dir(dir.path(), 2).await.unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].id, "frame_1");
        assert_eq!(frames[0].image_url, "data:image/jpeg;base64,Zmlyc3Q=");
        assert_eq!(frames[1].timestamp, "00:02");
        assert_eq!(frames[1].payload_base64(), "c2Vjb25k");
    }

    #[tokio::test]
    async fn test_empty_dir_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_frames_dir(dir.path(), 2).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidInput(_)));
    }
}
