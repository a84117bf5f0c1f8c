use async_trait::async_trait;
use thiserror::Error;

use crate::domain::meta::PipelineState;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable snapshot of the whole pipeline state. `save` is called after
/// every mutating step; a snapshot that errors must leave the previous one
/// intact.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckpointPort: Send + Sync {
    async fn save(&self, state: &PipelineState) -> Result<(), CheckpointError>;

    /// `None` when no snapshot exists yet (fresh run).
    async fn load(&self) -> Result<Option<PipelineState>, CheckpointError>;
}
