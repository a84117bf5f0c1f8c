use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::ports::storage::{Bucket, ObjectStorePort, StorageError};

/// Object store adapter for any S3-compatible API (MinIO in deployment).
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    main_bucket: String,
    tmp_bucket: String,
}

impl S3ObjectStore {
    /// Connect and verify the store is reachable. Fails before any pipeline
    /// state is created when the endpoint or credentials are wrong. Creates
    /// the tmp bucket if it does not exist yet.
    pub async fn connect(config: &Config) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "clipdedup",
        );
        let sdk_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .region(Region::new("us-east-1"))
            .force_path_style(true)
            .build();
        let client = Client::from_conf(sdk_config);

        client
            .list_buckets()
            .send()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        info!("connected to object store");

        let tmp_exists = client
            .head_bucket()
            .bucket(&config.tmp_bucket)
            .send()
            .await
            .is_ok();
        if !tmp_exists {
            client
                .create_bucket()
                .bucket(&config.tmp_bucket)
                .send()
                .await
                .map_err(|err| StorageError::Transport(err.to_string()))?;
            info!(bucket = %config.tmp_bucket, "created temporary bucket");
        }

        Ok(Self {
            client,
            main_bucket: config.main_bucket.clone(),
            tmp_bucket: config.tmp_bucket.clone(),
        })
    }

    fn bucket_name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Main => &self.main_bucket,
            Bucket::Tmp => &self.tmp_bucket,
        }
    }
}

#[async_trait]
impl ObjectStorePort for S3ObjectStore {
    async fn list(&self, bucket: Bucket) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(self.bucket_name(bucket))
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|err| StorageError::Transport(err.to_string()))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }
        }
        Ok(keys)
    }

    async fn download(
        &self,
        bucket: Bucket,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let service = err.into_service_error();
                if service.is_no_such_key() {
                    StorageError::NotFound {
                        bucket,
                        key: key.to_string(),
                    }
                } else {
                    StorageError::Transport(service.to_string())
                }
            })?;

        let body = resp
            .body
            .collect()
            .await
            .map_err(|err| StorageError::Transport(err.to_string()))?;
        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(local_path, body.into_bytes()).await?;
        Ok(())
    }

    async fn upload(&self, bucket: Bucket, local_path: &Path) -> Result<String, StorageError> {
        let key = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("invalid upload path {}", local_path.display()),
                ))
            })?
            .to_string();

        let body = tokio::fs::read(local_path).await?;
        let byte_stream = aws_sdk_s3::primitives::ByteStream::from(body);

        self.client
            .put_object()
            .bucket(self.bucket_name(bucket))
            .key(&key)
            .body(byte_stream)
            .send()
            .await
            .map_err(|err| StorageError::Transport(err.to_string()))?;
        Ok(key)
    }
}
