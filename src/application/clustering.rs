//! Stage 3: single-pass greedy grouping over the reordered table.
//!
//! Items are processed strictly longest-first, so every representative is at
//! least as long as every item compared against it afterwards. Each item is
//! judged against the snapshot of representatives taken when its submeta was
//! created; the first match wins and later representatives are never
//! candidates. Every flag transition is checkpointed, making the loop
//! re-enterable at comparison granularity.

use tracing::{debug, info};

use crate::application::remove_file_if_exists;
use crate::domain::meta::{PipelineState, VideoRecord};
use crate::domain::submeta::SubMeta;
use crate::error::PipelineError;
use crate::ports::checkpoint::CheckpointPort;
use crate::ports::similarity::SimilarityOraclePort;
use crate::ports::storage::{Bucket, ObjectStorePort};
use std::path::PathBuf;

/// Window score at or above this judges two videos similar.
pub const SIMILARITY_THRESHOLD: f32 = 0.75;
/// Sliding-window step over the longer video, in frames.
pub const FRAME_STEP: u64 = 100;

pub struct ClusteringService<'a, S, O, C> {
    storage: &'a S,
    oracle: &'a O,
    checkpoint: &'a C,
}

fn submeta(record: &VideoRecord) -> Result<&SubMeta, PipelineError> {
    record.submeta.as_ref().ok_or_else(|| {
        PipelineError::InconsistentState(format!("{} has no comparison submeta", record.remote_path))
    })
}

fn submeta_mut(record: &mut VideoRecord) -> Result<&mut SubMeta, PipelineError> {
    let path = record.remote_path.clone();
    record.submeta.as_mut().ok_or_else(|| {
        PipelineError::InconsistentState(format!("{path} has no comparison submeta"))
    })
}

/// Local feature blob path and duration of an item taking part in a
/// comparison.
fn features_ref(record: &VideoRecord) -> Result<(PathBuf, u64), PipelineError> {
    let path = record.local_features_path.clone().ok_or_else(|| {
        PipelineError::InconsistentState(format!(
            "{} has no local feature blob path",
            record.remote_path
        ))
    })?;
    let duration = record.duration.ok_or_else(|| {
        PipelineError::InconsistentState(format!("{} has no duration", record.remote_path))
    })?;
    Ok((path, duration))
}

impl<'a, S, O, C> ClusteringService<'a, S, O, C>
where
    S: ObjectStorePort,
    O: SimilarityOraclePort,
    C: CheckpointPort,
{
    pub fn new(storage: &'a S, oracle: &'a O, checkpoint: &'a C) -> Self {
        Self {
            storage,
            oracle,
            checkpoint,
        }
    }

    /// Process every item in post-reorder order.
    pub async fn run(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let total = state.len();
        for idx in 0..total {
            info!(item = idx + 1, total, "grouping");
            self.cluster_item(state, idx).await?;
        }
        Ok(())
    }

    async fn cluster_item(&self, state: &mut PipelineState, idx: usize) -> Result<(), PipelineError> {
        if state.records[idx].has_error {
            // Errored items are reported, never grouped.
            if state.records[idx].submeta.is_none() {
                state.records[idx].submeta = Some(SubMeta::closed());
                self.checkpoint.save(state).await?;
            }
            return Ok(());
        }

        if state.records[idx].submeta.is_none() {
            let snapshot = SubMeta::snapshot(&state.groups.representative_indices);
            debug!(
                candidates = snapshot.candidate_count(),
                "created comparison submeta"
            );
            state.records[idx].submeta = Some(snapshot);
            self.checkpoint.save(state).await?;
        }
        debug!(phase = ?submeta(&state.records[idx])?.phase(), "resuming item");

        if !submeta(&state.records[idx])?.current_downloaded {
            self.fetch_features(state, idx).await?;
            submeta_mut(&mut state.records[idx])?.current_downloaded = true;
            self.checkpoint.save(state).await?;
        }

        if submeta(&state.records[idx])?.current_compared {
            return Ok(());
        }

        let candidates = submeta(&state.records[idx])?.representative_indices.clone();
        for (k, &rep_idx) in candidates.iter().enumerate() {
            let similar = self
                .compare_with_representative(state, idx, rep_idx, k)
                .await?;
            if similar {
                // First match wins: a video never joins two groups.
                break;
            }
        }

        if submeta(&state.records[idx])?.matched_none() {
            let path = state.records[idx].remote_path.clone();
            state.groups.add_representative(idx, path);
        }
        let (own_features, _) = features_ref(&state.records[idx])?;
        remove_file_if_exists(&own_features).await?;
        submeta_mut(&mut state.records[idx])?.current_compared = true;
        self.checkpoint.save(state).await?;
        Ok(())
    }

    /// One comparison step against the candidate at snapshot position `k`.
    /// Already-recorded outcomes are reused without touching the network or
    /// the oracle. Returns whether the candidate matched.
    async fn compare_with_representative(
        &self,
        state: &mut PipelineState,
        idx: usize,
        rep_idx: usize,
        k: usize,
    ) -> Result<bool, PipelineError> {
        if !submeta(&state.records[idx])?.representative_downloaded[k] {
            self.fetch_features(state, rep_idx).await?;
            submeta_mut(&mut state.records[idx])?.representative_downloaded[k] = true;
            self.checkpoint.save(state).await?;
        }

        if !submeta(&state.records[idx])?.representative_compared[k] {
            let (short_path, short_duration) = features_ref(&state.records[idx])?;
            let (long_path, long_duration) = features_ref(&state.records[rep_idx])?;
            debug_assert!(long_duration >= short_duration);
            let outcome = self
                .oracle
                .compare(
                    &short_path,
                    short_duration,
                    &long_path,
                    long_duration,
                    SIMILARITY_THRESHOLD,
                    FRAME_STEP,
                )
                .await?;
            // One representative blob on disk at a time.
            remove_file_if_exists(&long_path).await?;

            let member = state.records[idx].remote_path.clone();
            let sub = submeta_mut(&mut state.records[idx])?;
            sub.is_similar_to_representative[k] = outcome.are_similar;
            sub.representative_compared[k] = true;
            if outcome.are_similar {
                state.groups.add_member(k, member);
            }
            // Outcome and membership persist in one step; a crash can never
            // separate a recorded comparison from its group effect.
            self.checkpoint.save(state).await?;
        }

        Ok(submeta(&state.records[idx])?.is_similar_to_representative[k])
    }

    /// Fetch an item's feature blob from the tmp bucket back to the local
    /// path it was extracted to.
    async fn fetch_features(&self, state: &PipelineState, idx: usize) -> Result<(), PipelineError> {
        let record = &state.records[idx];
        let key = record.remote_features_path.clone().ok_or_else(|| {
            PipelineError::InconsistentState(format!(
                "{} has no remote feature blob",
                record.remote_path
            ))
        })?;
        let (local_path, _) = features_ref(record)?;
        self.storage.download(Bucket::Tmp, &key, &local_path).await?;
        Ok(())
    }
}
