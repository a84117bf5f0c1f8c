//! Environment-driven configuration.

use std::env;
use std::path::PathBuf;

/// Runtime configuration for the deduplication pipeline.
#[derive(Clone, Debug)]
pub struct Config {
    /// Object store endpoint (URL of an S3-compatible API)
    pub endpoint: String,
    /// Object store access key
    pub access_key: String,
    /// Object store secret key
    pub secret_key: String,
    /// Bucket holding the source videos (read-only)
    pub main_bucket: String,
    /// Bucket used as durable scratch space for feature blobs
    pub tmp_bucket: String,
    /// Local directory for downloaded videos and feature blobs
    pub data_dir: PathBuf,
    /// Path of the checkpoint snapshot
    pub state_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics if the object store credentials are not set.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            endpoint: env::var("API_HOST").expect("API_HOST env var required"),
            access_key: env::var("API_USER").expect("API_USER env var required"),
            secret_key: env::var("API_KEY").expect("API_KEY env var required"),
            main_bucket: env::var("MAIN_BUCKET").unwrap_or_else(|_| String::from("mid")),
            tmp_bucket: env::var("TMP_BUCKET").unwrap_or_else(|_| String::from("mid-tmp")),
            data_dir: env::var("DATA_DIR")
                .unwrap_or_else(|_| String::from("saved_data"))
                .into(),
            state_path: env::var("STATE_PATH")
                .unwrap_or_else(|_| String::from("output/meta_data_latest.json"))
                .into(),
        }
    }
}
