use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use crate::ports::decoder::DecodedVideo;
use crate::ports::similarity::{
    read_features, Comparison, FeatureBlob, SimilarityError, SimilarityOraclePort,
};

/// Feature rows scored per model call; larger chunks run into model memory
/// limits.
const SEGMENT_ROWS: usize = 500;

/// The pretrained model behind the comparator. Implementations wrap real
/// inference; the pipeline only sees the [`SimilarityOraclePort`] built on
/// top of this.
#[cfg_attr(test, mockall::automock)]
pub trait FeatureModel: Send + Sync {
    /// Per-frame feature rows for a decoded video.
    fn extract(
        &self,
        video: &DecodedVideo,
        batch_size: usize,
    ) -> Result<FeatureBlob, SimilarityError>;

    /// Similarity of two equal-length feature segments, in `[0, 1]`.
    fn score(&self, a: &[Vec<f32>], b: &[Vec<f32>]) -> Result<f32, SimilarityError>;
}

/// Containment comparator: slides a window the length of the short video
/// over the long video's features and reports a match as soon as any window
/// scores at or above the threshold.
#[derive(Clone, Debug)]
pub struct SlidingWindowComparator<M> {
    model: M,
}

impl<M: FeatureModel> SlidingWindowComparator<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Score one window against the whole short side: both are chunked into
    /// `SEGMENT_ROWS` pieces and the per-piece scores are length-weighted.
    fn window_score(
        &self,
        window: &[Vec<f32>],
        short: &[Vec<f32>],
    ) -> Result<f32, SimilarityError> {
        let total = window.len().min(short.len());
        if total == 0 {
            return Ok(0.0);
        }
        let mut weighted = 0.0f32;
        let mut start = 0usize;
        while start < total {
            let end = (start + SEGMENT_ROWS).min(total);
            let score = self.model.score(&window[start..end], &short[start..end])?;
            weighted += score * ((end - start) as f32 / total as f32);
            start = end;
        }
        Ok(weighted)
    }
}

#[async_trait]
impl<M: FeatureModel> SimilarityOraclePort for SlidingWindowComparator<M> {
    async fn extract_features(
        &self,
        video: &DecodedVideo,
        batch_size: usize,
    ) -> Result<FeatureBlob, SimilarityError> {
        self.model.extract(video, batch_size)
    }

    async fn compare(
        &self,
        short_features_path: &Path,
        short_duration: u64,
        long_features_path: &Path,
        long_duration: u64,
        threshold: f32,
        step: u64,
    ) -> Result<Comparison, SimilarityError> {
        let short = read_features(short_features_path).await?;
        let long = read_features(long_features_path).await?;

        let mut result = Comparison {
            are_similar: false,
            max_similarity: 0.0,
        };
        let short_rows = short_duration as usize;
        // Window starts walk [0, long - short) in `step` increments; videos
        // of equal duration yield no window at all.
        let span = long_duration.saturating_sub(short_duration) as usize;
        let step = (step as usize).max(1);
        let mut offset = 0usize;
        while offset < span {
            let window_start = offset.min(long.len());
            let window_end = (offset + short_rows).min(long.len());
            let score = self.window_score(&long[window_start..window_end], &short)?;
            if score > result.max_similarity {
                result.max_similarity = score;
            }
            if score >= threshold {
                result.are_similar = true;
                break;
            }
            offset += step;
        }
        debug!(
            similar = result.are_similar,
            max = result.max_similarity,
            "compared feature windows"
        );
        Ok(result)
    }
}
