use crate::adapters::window::FeatureModel;
use crate::ports::decoder::{DecodedVideo, Frame};
use crate::ports::similarity::{FeatureBlob, SimilarityError};

/// Histogram bins per color channel; feature rows are 4^3 = 64 wide.
const BINS: usize = 4;

/// Baseline feature model: per-frame coarse RGB histograms scored by mean
/// cosine similarity. A stand-in for real embedding inference behind the
/// same [`FeatureModel`] seam.
#[derive(Clone, Copy, Debug, Default)]
pub struct HistogramModel;

impl FeatureModel for HistogramModel {
    fn extract(
        &self,
        video: &DecodedVideo,
        _batch_size: usize,
    ) -> Result<FeatureBlob, SimilarityError> {
        Ok(video.frames.iter().map(frame_histogram).collect())
    }

    fn score(&self, a: &[Vec<f32>], b: &[Vec<f32>]) -> Result<f32, SimilarityError> {
        let pairs = a.len().min(b.len());
        if pairs == 0 {
            return Ok(0.0);
        }
        let total: f32 = a.iter().zip(b).map(|(x, y)| cosine(x, y)).sum();
        Ok(total / pairs as f32)
    }
}

fn frame_histogram(frame: &Frame) -> Vec<f32> {
    let mut hist = vec![0.0f32; BINS * BINS * BINS];
    for px in frame.rgb.chunks_exact(3) {
        let r = px[0] as usize * BINS / 256;
        let g = px[1] as usize * BINS / 256;
        let b = px[2] as usize * BINS / 256;
        hist[(r * BINS + g) * BINS + b] += 1.0;
    }
    let pixels = (frame.rgb.len() / 3).max(1) as f32;
    for bin in &mut hist {
        *bin /= pixels;
    }
    hist
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
