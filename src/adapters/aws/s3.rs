use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::ports::storage::ObjectStorage;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Builder, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::{debug, info};

/// `ObjectStorage` over S3 or any S3-compatible service (MinIO, R2).
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Build a client from config. Static credentials win over the default
    /// provider chain when both keys are set.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = Builder::from(&shared).force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder.credentials_provider(Credentials::new(
                key, secret, None, None, "vodforge",
            ));
        }

        Self::new(Client::from_conf(builder.build()), config.bucket.clone())
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn ensure_container(&self) -> Result<(), StorageError> {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            return Ok(());
        }

        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                info!(bucket = %self.bucket, "Created bucket");
                Ok(())
            }
            Err(err) => {
                let raced = err.as_service_error().is_some_and(|e| {
                    e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists()
                });
                if raced {
                    Ok(())
                } else {
                    Err(StorageError::Backend(err.to_string()))
                }
            }
        }
    }

    async fn put_file(
        &self,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        debug!(key, content_type, "Uploaded object");
        Ok(())
    }

    async fn download(&self, key: &str, local_path: &Path) -> Result<(), StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::Backend(err.to_string())
                }
            })?;

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        tokio::fs::write(local_path, body.into_bytes()).await?;
        Ok(())
    }
}
