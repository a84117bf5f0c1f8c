use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// The two logical buckets the pipeline touches. Requests for anything else
/// are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Read-only bucket of source videos.
    Main,
    /// Durable scratch space for extracted feature blobs.
    Tmp,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Main => write!(f, "main"),
            Bucket::Tmp => write!(f, "tmp"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be reached at all. Raised at startup before any
    /// state exists; fatal.
    #[error("object store unreachable: {0}")]
    Connection(String),

    #[error("object {key} not found in {bucket} bucket")]
    NotFound { bucket: Bucket, key: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorePort: Send + Sync {
    /// List all object keys in a bucket.
    async fn list(&self, bucket: Bucket) -> Result<Vec<String>, StorageError>;

    /// Download an object to a local path.
    async fn download(
        &self,
        bucket: Bucket,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError>;

    /// Upload a local file; the remote key is the local file name.
    /// Returns the assigned key.
    async fn upload(&self, bucket: Bucket, local_path: &Path) -> Result<String, StorageError>;
}
