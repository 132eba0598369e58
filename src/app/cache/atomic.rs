//! Durable sidecar writes using the temp file + rename pattern

use std::path::Path;

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::error;

use crate::errors::{CacheError, CacheResult};

use super::path::PathGenerator;

/// Serialize `value` as JSON and atomically replace `path` with it
///
/// The temp file is synced before the rename so a crash leaves either the
/// previous content or the new content, never a torn file.
pub async fn write_json_atomic<T>(path: &Path, value: &T) -> CacheResult<()>
where
    T: Serialize + ?Sized,
{
    let content = serde_json::to_vec_pretty(value).map_err(|e| CacheError::PersistFailed {
        path: path.to_path_buf(),
        reason: format!("serialization failed: {}", e),
    })?;

    write_atomic(path, &content).await
}

/// Atomically replace `path` with `content`
pub async fn write_atomic(path: &Path, content: &[u8]) -> CacheResult<()> {
    let temp_path = PathGenerator::temp_path(path);
    let persist_failed = |e: std::io::Error| {
        error!("Failed to persist {}: {}", path.display(), e);
        CacheError::PersistFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    };

    let mut file = fs::File::create(&temp_path).await.map_err(persist_failed)?;
    file.write_all(content).await.map_err(persist_failed)?;
    file.sync_all().await.map_err(persist_failed)?;
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(persist_failed(e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_json_atomic_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ranges.json");

        write_json_atomic(&path, &vec![1u32, 2, 3]).await.unwrap();
        write_json_atomic(&path, &vec![4u32]).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<u32> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, vec![4]);
        assert!(!PathGenerator::temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_write_atomic_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("descriptor.json");

        let result = write_atomic(&path, b"{}").await;
        assert!(matches!(result, Err(CacheError::PersistFailed { .. })));
    }
}
