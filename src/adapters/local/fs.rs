use crate::error::StorageError;
use crate::ports::storage::ObjectStorage;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `ObjectStorage` backed by a local directory: `<root>/<container>/<key>`.
/// Used for single-host deployments and tests.
#[derive(Debug, Clone)]
pub struct FsStorage {
    container_dir: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl AsRef<Path>, container: &str) -> Self {
        Self {
            container_dir: root.as_ref().join(container),
        }
    }

    /// Where `key` lives on disk.
    pub fn object_path(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.container_dir.clone(), |path, part| path.join(part))
    }

    fn check_key(key: &str) -> Result<(), StorageError> {
        if key.is_empty() || key.split('/').any(|part| part == "..") {
            return Err(StorageError::Backend(format!("invalid object key '{}'", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for FsStorage {
    async fn ensure_container(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.container_dir).await?;
        Ok(())
    }

    async fn put_file(
        &self,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        Self::check_key(key)?;
        let destination = self.object_path(key);
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local_path, &destination).await?;
        debug!(key, content_type, "Stored object on local filesystem");
        Ok(())
    }

    async fn download(&self, key: &str, local_path: &Path) -> Result<(), StorageError> {
        Self::check_key(key)?;
        let source = self.object_path(key);
        if !tokio::fs::try_exists(&source).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&source, local_path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_then_download() {
        let root = tempdir().unwrap();
        let storage = FsStorage::new(root.path(), "videos");
        storage.ensure_container().await.unwrap();
        storage.ensure_container().await.unwrap();

        let local = root.path().join("local.ts");
        tokio::fs::write(&local, b"segment").await.unwrap();

        storage
            .put_file("videos/1/360p/segment_000.ts", &local, "video/MP2T")
            .await
            .unwrap();
        assert!(storage.object_path("videos/1/360p/segment_000.ts").exists());

        let fetched = root.path().join("out").join("copy.ts");
        storage
            .download("videos/1/360p/segment_000.ts", &fetched)
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&fetched).await.unwrap(), b"segment");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let root = tempdir().unwrap();
        let storage = FsStorage::new(root.path(), "videos");
        let err = storage
            .download("thumbnails/1.jpg", &root.path().join("x.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let root = tempdir().unwrap();
        let storage = FsStorage::new(root.path(), "videos");
        let local = root.path().join("local.ts");
        tokio::fs::write(&local, b"x").await.unwrap();
        assert!(storage.put_file("../evil", &local, "video/MP2T").await.is_err());
    }
}
