use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::meta::PipelineState;
use crate::ports::checkpoint::{CheckpointError, CheckpointPort};

/// Checkpoint store backed by a single JSON file. Snapshots are written to a
/// sidecar file first and renamed into place, so a crash mid-write leaves
/// the previous snapshot readable.
#[derive(Clone, Debug)]
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CheckpointPort for JsonCheckpointStore {
    async fn save(&self, state: &PipelineState) -> Result<(), CheckpointError> {
        let payload = serde_json::to_vec(state)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, payload).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<PipelineState>, CheckpointError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn load_returns_none_without_a_snapshot() {
        let dir = tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("state.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("out/state.json"));

        let mut state = PipelineState::from_listing(vec!["a.mp4".into(), "b.mp4".into()]);
        state.records[0].downloaded = true;
        state.records[0].duration = Some(42);
        store.save(&state).await.unwrap();

        let restored = store.load().await.unwrap().unwrap();
        assert_eq!(restored, state);
    }

    #[tokio::test]
    async fn save_replaces_the_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("state.json"));

        let mut state = PipelineState::from_listing(vec!["a.mp4".into()]);
        store.save(&state).await.unwrap();
        state.records[0].downloaded = true;
        store.save(&state).await.unwrap();

        let restored = store.load().await.unwrap().unwrap();
        assert!(restored.records[0].downloaded);
    }
}
