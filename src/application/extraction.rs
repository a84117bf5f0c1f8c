//! Stage 1: per-item download, decode, feature extraction and upload.
//!
//! Each stage is idempotent (skipped when its flag is already set) and is
//! followed by exactly one checkpoint write, so a restart re-enters at the
//! first incomplete stage without repeating network transfer or inference.

use std::path::Path;
use tracing::info;

use crate::application::remove_file_if_exists;
use crate::domain::meta::PipelineState;
use crate::error::PipelineError;
use crate::ports::checkpoint::CheckpointPort;
use crate::ports::decoder::{DecodedVideo, VideoDecoderPort};
use crate::ports::similarity::{write_features, SimilarityOraclePort};
use crate::ports::storage::{Bucket, ObjectStorePort};

/// Frames handed to the model per inference batch.
pub const FEATURE_BATCH_SIZE: usize = 32;

pub struct ExtractionService<'a, S, D, O, C> {
    storage: &'a S,
    decoder: &'a D,
    oracle: &'a O,
    checkpoint: &'a C,
    data_dir: &'a Path,
}

impl<'a, S, D, O, C> ExtractionService<'a, S, D, O, C>
where
    S: ObjectStorePort,
    D: VideoDecoderPort,
    O: SimilarityOraclePort,
    C: CheckpointPort,
{
    pub fn new(
        storage: &'a S,
        decoder: &'a D,
        oracle: &'a O,
        checkpoint: &'a C,
        data_dir: &'a Path,
    ) -> Self {
        Self {
            storage,
            decoder,
            oracle,
            checkpoint,
            data_dir,
        }
    }

    /// Run the three stages over every item in table order.
    pub async fn run(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let total = state.len();
        for idx in 0..total {
            info!(item = idx + 1, total, "extracting features");
            if !state.records[idx].downloaded {
                self.download_video(state, idx).await?;
            }
            if !state.records[idx].features_extracted {
                self.extract_features(state, idx).await?;
            }
            if !state.records[idx].features_uploaded {
                self.upload_features(state, idx).await?;
            }
        }
        Ok(())
    }

    async fn download_video(
        &self,
        state: &mut PipelineState,
        idx: usize,
    ) -> Result<(), PipelineError> {
        let local_path = self.data_dir.join(&state.records[idx].file_name);
        self.storage
            .download(Bucket::Main, &state.records[idx].remote_path, &local_path)
            .await?;

        let record = &mut state.records[idx];
        record.local_video_path = Some(local_path);
        record.downloaded = true;
        self.checkpoint.save(state).await?;
        Ok(())
    }

    async fn extract_features(
        &self,
        state: &mut PipelineState,
        idx: usize,
    ) -> Result<(), PipelineError> {
        if state.records[idx].has_error {
            state.records[idx].features_extracted = true;
            self.checkpoint.save(state).await?;
            return Ok(());
        }

        let video = self.read_video(state, idx).await?;
        if state.records[idx].has_error {
            // Zero usable frames: nothing to run the model on.
            state.records[idx].features_extracted = true;
            self.checkpoint.save(state).await?;
            return Ok(());
        }

        let features = self
            .oracle
            .extract_features(&video, FEATURE_BATCH_SIZE)
            .await?;
        let features_name = format!("{}_features.json", state.records[idx].file_stem);
        let local_features_path = self.data_dir.join(&features_name);
        write_features(&local_features_path, &features).await?;

        let record = &mut state.records[idx];
        record.local_features_path = Some(local_features_path);
        record.remote_features_path = Some(features_name);
        record.features_extracted = true;
        self.checkpoint.save(state).await?;
        Ok(())
    }

    /// Decode the downloaded file. The first decode fixes the item's
    /// duration and error flag; repeats reuse the recorded values.
    async fn read_video(
        &self,
        state: &mut PipelineState,
        idx: usize,
    ) -> Result<DecodedVideo, PipelineError> {
        let local_path = state.records[idx]
            .local_video_path
            .clone()
            .ok_or_else(|| {
                PipelineError::InconsistentState(format!(
                    "{} is flagged downloaded but has no local path",
                    state.records[idx].remote_path
                ))
            })?;

        let video = self.decoder.decode(&local_path).await?;
        if !state.records[idx].read {
            let record = &mut state.records[idx];
            record.duration = Some(video.frame_count());
            record.has_error = video.is_empty();
            record.read = true;
            self.checkpoint.save(state).await?;
        }
        Ok(video)
    }

    async fn upload_features(
        &self,
        state: &mut PipelineState,
        idx: usize,
    ) -> Result<(), PipelineError> {
        if state.records[idx].has_error {
            // Skip-as-resolved: nothing to upload, drop the useless video.
            if let Some(video_path) = state.records[idx].local_video_path.clone() {
                remove_file_if_exists(&video_path).await?;
            }
            state.records[idx].features_uploaded = true;
            self.checkpoint.save(state).await?;
            return Ok(());
        }

        let features_path = state.records[idx]
            .local_features_path
            .clone()
            .ok_or_else(|| {
                PipelineError::InconsistentState(format!(
                    "{} is flagged extracted but has no local feature blob",
                    state.records[idx].remote_path
                ))
            })?;
        let key = self.storage.upload(Bucket::Tmp, &features_path).await?;

        remove_file_if_exists(&features_path).await?;
        if let Some(video_path) = state.records[idx].local_video_path.clone() {
            remove_file_if_exists(&video_path).await?;
        }

        let record = &mut state.records[idx];
        record.remote_features_path = Some(key);
        record.features_uploaded = true;
        self.checkpoint.save(state).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::checkpoint::MockCheckpointPort;
    use crate::ports::decoder::{Frame, MockVideoDecoderPort};
    use crate::ports::similarity::MockSimilarityOraclePort;
    use crate::ports::storage::MockObjectStorePort;
    use tempfile::tempdir;

    fn frames(n: usize) -> DecodedVideo {
        DecodedVideo {
            frames: vec![
                Frame {
                    width: 1,
                    height: 1,
                    rgb: vec![0, 0, 0],
                };
                n
            ],
        }
    }

    fn completed_state() -> PipelineState {
        let mut state = PipelineState::from_listing(vec!["a.mp4".into(), "b.mp4".into()]);
        for record in &mut state.records {
            record.downloaded = true;
            record.read = true;
            record.features_extracted = true;
            record.features_uploaded = true;
            record.duration = Some(10);
        }
        state
    }

    #[tokio::test]
    async fn completed_items_trigger_no_calls_at_all() {
        // Mocks without expectations panic on any call.
        let storage = MockObjectStorePort::new();
        let decoder = MockVideoDecoderPort::new();
        let oracle = MockSimilarityOraclePort::new();
        let checkpoint = MockCheckpointPort::new();

        let mut state = completed_state();
        let before = state.clone();

        let dir = tempdir().unwrap();
        let service =
            ExtractionService::new(&storage, &decoder, &oracle, &checkpoint, dir.path());
        service.run(&mut state).await.unwrap();

        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn happy_path_runs_all_stages_for_one_item() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().to_path_buf();

        let mut storage = MockObjectStorePort::new();
        storage
            .expect_download()
            .withf(|bucket, key, _| *bucket == Bucket::Main && key == "videos/a.mp4")
            .once()
            .returning(|_, _, _| Ok(()));
        storage
            .expect_upload()
            .withf(|bucket, path| {
                *bucket == Bucket::Tmp
                    && path.file_name().unwrap().to_str() == Some("a_features.json")
            })
            .once()
            .returning(|_, _| Ok(String::from("a_features.json")));

        let mut decoder = MockVideoDecoderPort::new();
        decoder.expect_decode().once().returning(|_| Ok(frames(7)));

        let mut oracle = MockSimilarityOraclePort::new();
        oracle
            .expect_extract_features()
            .withf(|video, batch| video.frame_count() == 7 && *batch == FEATURE_BATCH_SIZE)
            .once()
            .returning(|_, _| Ok(vec![vec![1.0]; 7]));

        let mut checkpoint = MockCheckpointPort::new();
        // download, read, extract, upload
        checkpoint.expect_save().times(4).returning(|_| Ok(()));

        let mut state = PipelineState::from_listing(vec!["videos/a.mp4".into()]);
        let service = ExtractionService::new(&storage, &decoder, &oracle, &checkpoint, &data_dir);
        service.run(&mut state).await.unwrap();

        let record = &state.records[0];
        assert!(record.downloaded && record.read);
        assert!(record.features_extracted && record.features_uploaded);
        assert_eq!(record.duration, Some(7));
        assert!(!record.has_error);
        assert_eq!(record.remote_features_path.as_deref(), Some("a_features.json"));
        // Uploaded feature blob was deleted locally.
        assert!(!data_dir.join("a_features.json").exists());
    }

    #[tokio::test]
    async fn zero_frames_flags_the_item_and_skips_model_and_upload() {
        let dir = tempdir().unwrap();

        let mut storage = MockObjectStorePort::new();
        storage.expect_download().once().returning(|_, _, _| Ok(()));
        // No upload expectation: an upload call would panic.

        let mut decoder = MockVideoDecoderPort::new();
        decoder
            .expect_decode()
            .once()
            .returning(|_| Ok(DecodedVideo::default()));

        let oracle = MockSimilarityOraclePort::new();

        let mut checkpoint = MockCheckpointPort::new();
        // download, read, extract(skip), upload(skip)
        checkpoint.expect_save().times(4).returning(|_| Ok(()));

        let mut state = PipelineState::from_listing(vec!["broken.mp4".into()]);
        let service =
            ExtractionService::new(&storage, &decoder, &oracle, &checkpoint, dir.path());
        service.run(&mut state).await.unwrap();

        let record = &state.records[0];
        assert!(record.has_error);
        assert_eq!(record.duration, Some(0));
        assert!(record.features_extracted && record.features_uploaded);
        assert!(record.remote_features_path.is_none());
    }

    #[tokio::test]
    async fn resume_skips_the_already_downloaded_stage() {
        let dir = tempdir().unwrap();

        let mut storage = MockObjectStorePort::new();
        // Only the upload may happen; a download call would panic.
        storage
            .expect_upload()
            .once()
            .returning(|_, _| Ok(String::from("a_features.json")));

        let mut decoder = MockVideoDecoderPort::new();
        decoder.expect_decode().once().returning(|_| Ok(frames(5)));

        let mut oracle = MockSimilarityOraclePort::new();
        oracle
            .expect_extract_features()
            .once()
            .returning(|_, _| Ok(vec![vec![0.5]; 5]));

        let mut checkpoint = MockCheckpointPort::new();
        checkpoint.expect_save().times(3).returning(|_| Ok(()));

        let mut state = PipelineState::from_listing(vec!["a.mp4".into()]);
        state.records[0].downloaded = true;
        state.records[0].local_video_path = Some(dir.path().join("a.mp4"));

        let service =
            ExtractionService::new(&storage, &decoder, &oracle, &checkpoint, dir.path());
        service.run(&mut state).await.unwrap();
        assert!(state.records[0].features_uploaded);
    }

    #[tokio::test]
    async fn downloaded_without_local_path_is_reported_as_corrupt_state() {
        let dir = tempdir().unwrap();
        let storage = MockObjectStorePort::new();
        let decoder = MockVideoDecoderPort::new();
        let oracle = MockSimilarityOraclePort::new();
        let checkpoint = MockCheckpointPort::new();

        let mut state = PipelineState::from_listing(vec!["a.mp4".into()]);
        state.records[0].downloaded = true; // but no local path recorded

        let service =
            ExtractionService::new(&storage, &decoder, &oracle, &checkpoint, dir.path());
        let err = service.run(&mut state).await.unwrap_err();
        assert!(matches!(err, PipelineError::InconsistentState(_)));
    }
}
