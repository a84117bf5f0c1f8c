//! End-to-end orchestration: resume or initialize, extract, reorder, cluster.

use std::path::PathBuf;
use tracing::info;

use crate::application::clustering::ClusteringService;
use crate::application::extraction::ExtractionService;
use crate::domain::meta::PipelineState;
use crate::domain::report::DedupReport;
use crate::error::PipelineError;
use crate::ports::checkpoint::CheckpointPort;
use crate::ports::decoder::VideoDecoderPort;
use crate::ports::similarity::SimilarityOraclePort;
use crate::ports::storage::{Bucket, ObjectStorePort};

pub struct PipelineService<S, D, O, C> {
    storage: S,
    decoder: D,
    oracle: O,
    checkpoint: C,
    data_dir: PathBuf,
}

impl<S, D, O, C> PipelineService<S, D, O, C>
where
    S: ObjectStorePort,
    D: VideoDecoderPort,
    O: SimilarityOraclePort,
    C: CheckpointPort,
{
    pub fn new(storage: S, decoder: D, oracle: O, checkpoint: C, data_dir: PathBuf) -> Self {
        Self {
            storage,
            decoder,
            oracle,
            checkpoint,
            data_dir,
        }
    }

    /// Run the pipeline to completion and return the final report. Safe to
    /// call again after any interruption; completed steps are never redone.
    pub async fn run(&self) -> Result<DedupReport, PipelineError> {
        let mut state = self.load_or_init().await?;

        ExtractionService::new(
            &self.storage,
            &self.decoder,
            &self.oracle,
            &self.checkpoint,
            &self.data_dir,
        )
        .run(&mut state)
        .await?;

        if !state.reordered {
            state.reorder_by_duration()?;
            self.checkpoint.save(&state).await?;
            info!(videos = state.len(), "table reordered by duration");
        }

        ClusteringService::new(&self.storage, &self.oracle, &self.checkpoint)
            .run(&mut state)
            .await?;

        let report = DedupReport::from_state(&state);
        info!(
            groups = state.groups.group_count,
            failed = report.failed_to_process.len(),
            "pipeline complete"
        );
        Ok(report)
    }

    /// Resume from the last snapshot, or build a fresh table from the
    /// store's current listing.
    async fn load_or_init(&self) -> Result<PipelineState, PipelineError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        if let Some(state) = self.checkpoint.load().await? {
            info!(videos = state.len(), "resuming from checkpoint");
            return Ok(state);
        }

        let listing = self.storage.list(Bucket::Main).await?;
        info!(videos = listing.len(), "discovered source videos");
        let state = PipelineState::from_listing(listing);
        self.checkpoint.save(&state).await?;
        Ok(state)
    }
}
