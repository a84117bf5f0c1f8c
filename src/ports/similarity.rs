use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::ports::decoder::DecodedVideo;

/// Per-frame feature rows extracted by the model, one row per sampled frame.
pub type FeatureBlob = Vec<Vec<f32>>;

/// Outcome of one containment comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub are_similar: bool,
    /// Best window score observed, reported even when below threshold.
    pub max_similarity: f32,
}

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("feature blob encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("model failure: {0}")]
    Model(String),
}

/// The pairwise judgment the clustering engine depends on. Contract:
/// `compare` treats the first argument as the shorter video and the second
/// as the longer one; callers must guarantee `short_duration <=
/// long_duration`. Both sides are referenced by the local path of their
/// feature blob so at most two blobs need to be resident at once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SimilarityOraclePort: Send + Sync {
    /// Extract per-frame features from a decoded video.
    async fn extract_features(
        &self,
        video: &DecodedVideo,
        batch_size: usize,
    ) -> Result<FeatureBlob, SimilarityError>;

    /// Judge whether the short video is contained in the long one. Scans the
    /// long side in `step`-frame increments and reports similar as soon as
    /// any window scores at or above `threshold`.
    #[allow(clippy::too_many_arguments)]
    async fn compare(
        &self,
        short_features_path: &Path,
        short_duration: u64,
        long_features_path: &Path,
        long_duration: u64,
        threshold: f32,
        step: u64,
    ) -> Result<Comparison, SimilarityError>;
}

/// Write a feature blob to a local file.
pub async fn write_features(path: &Path, features: &FeatureBlob) -> Result<(), SimilarityError> {
    let payload = serde_json::to_vec(features)?;
    tokio::fs::write(path, payload).await?;
    Ok(())
}

/// Read a feature blob back from a local file.
pub async fn read_features(path: &Path) -> Result<FeatureBlob, SimilarityError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
