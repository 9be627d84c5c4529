use crate::error::StorageError;
use async_trait::async_trait;
use std::path::Path;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Create the bucket/container if it does not exist yet. Idempotent.
    async fn ensure_container(&self) -> Result<(), StorageError>;

    /// Upload a file from a local path to storage
    async fn put_file(
        &self,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Download an object from storage to a local path
    async fn download(&self, key: &str, local_path: &Path) -> Result<(), StorageError>;
}
