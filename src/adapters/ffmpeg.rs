use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::warn;

use crate::ports::decoder::{DecodeError, DecodedVideo, Frame, VideoDecoderPort};

/// Side length of the sampled frames.
const SAMPLE_SIZE: u32 = 256;

/// Decoder shelling out to the `ffmpeg` binary. Samples one frame per
/// second, scaled and center-cropped to a 256x256 RGB square, streamed back
/// as raw video on stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegDecoder;

#[async_trait]
impl VideoDecoderPort for FfmpegDecoder {
    async fn decode(&self, path: &Path) -> Result<DecodedVideo, DecodeError> {
        let filter = format!(
            "fps=1,scale={s}:{s}:force_original_aspect_ratio=increase,crop={s}:{s}",
            s = SAMPLE_SIZE
        );
        let output = Command::new("ffmpeg")
            .arg("-v")
            .arg("error")
            .arg("-i")
            .arg(path)
            .arg("-vf")
            .arg(filter)
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("pipe:1")
            .output()
            .await
            .map_err(|source| DecodeError::Tool {
                tool: "ffmpeg",
                source,
            })?;

        if !output.status.success() {
            // Unreadable input is an empty clip, not a failure; the caller
            // flags the item and moves on.
            warn!(path = %path.display(), "ffmpeg could not decode file");
            return Ok(DecodedVideo::default());
        }

        let frame_bytes = (SAMPLE_SIZE * SAMPLE_SIZE * 3) as usize;
        let frames = output
            .stdout
            .chunks_exact(frame_bytes)
            .map(|chunk| Frame {
                width: SAMPLE_SIZE,
                height: SAMPLE_SIZE,
                rgb: chunk.to_vec(),
            })
            .collect();
        Ok(DecodedVideo { frames })
    }
}
