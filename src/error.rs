//! Pipeline-level error type aggregating the per-seam errors.

use thiserror::Error;

use crate::ports::checkpoint::CheckpointError;
use crate::ports::decoder::DecodeError;
use crate::ports::similarity::SimilarityError;
use crate::ports::storage::StorageError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Similarity(#[from] SimilarityError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// Group indices point into the table; permuting rows under them would
    /// leave every stored index stale.
    #[error("cannot reorder the table after grouping has started")]
    ReorderAfterGrouping,

    /// A checkpoint claimed a stage was complete but the data the stage
    /// produces is missing from the snapshot.
    #[error("inconsistent checkpoint state: {0}")]
    InconsistentState(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
