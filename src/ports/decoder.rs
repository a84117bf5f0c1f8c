use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// One sampled frame, RGB24.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// A decoded video: the ordered frames sampled from it. The frame count is
/// what the pipeline records as the item's duration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedVideo {
    pub frames: Vec<Frame>,
}

impl DecodedVideo {
    pub fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The decoder binary itself could not be run. Unreadable *input* is not
    /// an error: it decodes to an empty frame list.
    #[error("failed to run {tool}: {source}")]
    Tool {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoDecoderPort: Send + Sync {
    /// Decode a local video file. An unreadable or corrupt file yields an
    /// empty frame list, not an error.
    async fn decode(&self, path: &Path) -> Result<DecodedVideo, DecodeError>;
}
