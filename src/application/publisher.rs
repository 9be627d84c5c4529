//! Uploads a local directory tree under a storage prefix.

use crate::domain::layout::{content_type_for, object_key};
use crate::error::StorageError;
use crate::ports::storage::ObjectStorage;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Regular files under `root`, relative to it, sorted.
pub async fn collect_files(root: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                if let Ok(relative) = path.strip_prefix(root) {
                    files.push(relative.to_path_buf());
                }
            }
        }
    }
    files.sort();
    Ok(files)
}

async fn upload_tree<S>(storage: &S, local_dir: &Path, prefix: &str) -> Result<Vec<String>, StorageError>
where
    S: ObjectStorage + ?Sized,
{
    storage.ensure_container().await?;

    let mut keys = Vec::new();
    for relative in collect_files(local_dir).await? {
        let key = object_key(prefix, &relative).ok_or_else(|| {
            StorageError::Backend(format!("unusable path {}", relative.display()))
        })?;
        let local = local_dir.join(&relative);
        storage.put_file(&key, &local, content_type_for(&local)).await?;
        debug!(key = %key, "Published artifact");
        keys.push(key);
    }
    Ok(keys)
}

/// Upload every file under `local_dir` to `prefix/<relative path>`.
///
/// Returns the keys written. Any failure yields an empty list, which the
/// pipeline treats as a failed publish; objects already written are left for
/// the next run to overwrite.
pub async fn publish_tree<S>(storage: &S, local_dir: &Path, prefix: &str) -> Vec<String>
where
    S: ObjectStorage + ?Sized,
{
    match upload_tree(storage, local_dir, prefix).await {
        Ok(keys) => keys,
        Err(e) => {
            warn!(prefix, error = %e, "Publish failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::FsStorage;
    use crate::ports::storage::MockObjectStorage;
    use mockall::predicate::eq;
    use tempfile::tempdir;

    async fn sample_tree(root: &Path) {
        tokio::fs::create_dir_all(root.join("720p")).await.unwrap();
        tokio::fs::create_dir_all(root.join("360p")).await.unwrap();
        tokio::fs::write(root.join("master.m3u8"), "#EXTM3U\n").await.unwrap();
        tokio::fs::write(root.join("720p/playlist.m3u8"), "#EXTM3U\n").await.unwrap();
        tokio::fs::write(root.join("720p/segment_000.ts"), b"ts").await.unwrap();
        tokio::fs::write(root.join("360p/segment_000.ts"), b"ts").await.unwrap();
    }

    #[tokio::test]
    async fn test_uploads_sorted_tree() {
        let work = tempdir().unwrap();
        let bucket = tempdir().unwrap();
        sample_tree(work.path()).await;
        let storage = FsStorage::new(bucket.path(), "videos");

        let keys = publish_tree(&storage, work.path(), "videos/7").await;
        assert_eq!(
            keys,
            [
                "videos/7/360p/segment_000.ts",
                "videos/7/720p/playlist.m3u8",
                "videos/7/720p/segment_000.ts",
                "videos/7/master.m3u8",
            ]
        );
        assert!(storage.object_path("videos/7/master.m3u8").exists());
    }

    #[tokio::test]
    async fn test_content_types() {
        let work = tempdir().unwrap();
        sample_tree(work.path()).await;
        let mut storage = MockObjectStorage::new();
        storage.expect_ensure_container().times(1).returning(|| Ok(()));
        storage
            .expect_put_file()
            .with(eq("videos/7/master.m3u8"), mockall::predicate::always(), eq("application/x-mpegURL"))
            .returning(|_, _, _| Ok(()));
        storage
            .expect_put_file()
            .with(
                eq("videos/7/720p/playlist.m3u8"),
                mockall::predicate::always(),
                eq("application/x-mpegURL"),
            )
            .returning(|_, _, _| Ok(()));
        storage
            .expect_put_file()
            .with(mockall::predicate::always(), mockall::predicate::always(), eq("video/MP2T"))
            .times(2)
            .returning(|_, _, _| Ok(()));

        assert_eq!(publish_tree(&storage, work.path(), "videos/7").await.len(), 4);
    }

    #[tokio::test]
    async fn test_any_failure_returns_empty() {
        let work = tempdir().unwrap();
        sample_tree(work.path()).await;
        let mut storage = MockObjectStorage::new();
        storage.expect_ensure_container().returning(|| Ok(()));
        storage
            .expect_put_file()
            .returning(|key, _, _| {
                if key.ends_with("master.m3u8") {
                    Err(StorageError::Backend("connection reset".into()))
                } else {
                    Ok(())
                }
            });

        assert!(publish_tree(&storage, work.path(), "videos/7").await.is_empty());
    }

    #[tokio::test]
    async fn test_container_failure_returns_empty() {
        let work = tempdir().unwrap();
        sample_tree(work.path()).await;
        let mut storage = MockObjectStorage::new();
        storage
            .expect_ensure_container()
            .returning(|| Err(StorageError::Backend("no such host".into())));

        assert!(publish_tree(&storage, work.path(), "videos/7").await.is_empty());
    }
}
