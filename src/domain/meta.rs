use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::groups::GroupState;
use crate::domain::submeta::SubMeta;
use crate::error::PipelineError;

/// One row of the video table.
///
/// Rows are created once at discovery and only ever mutated afterwards.
/// Everything an item accumulates on its way through the pipeline lives in
/// its row, so permuting the table can never misalign one attribute against
/// another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Source object key in the main bucket (immutable once discovered).
    pub remote_path: String,
    /// Object file name, e.g. `clip.mp4`.
    pub file_name: String,
    /// File name without extension, used to derive the feature blob name.
    pub file_stem: String,
    pub local_video_path: Option<PathBuf>,
    pub local_features_path: Option<PathBuf>,
    pub remote_features_path: Option<String>,
    /// Frame count, set once on first successful decode.
    pub duration: Option<u64>,
    /// Sticky: the decode produced zero usable frames.
    pub has_error: bool,
    pub downloaded: bool,
    pub read: bool,
    pub features_extracted: bool,
    pub features_uploaded: bool,
    /// Unique id assigned at discovery. Carries item identity through the
    /// reordering step and breaks ties between equal durations.
    pub discovery_index: u64,
    pub submeta: Option<SubMeta>,
}

impl VideoRecord {
    pub fn new(remote_path: String, discovery_index: u64) -> Self {
        let file_name = remote_path
            .rsplit('/')
            .next()
            .unwrap_or(remote_path.as_str())
            .to_string();
        let file_stem = file_name
            .split('.')
            .next()
            .unwrap_or(file_name.as_str())
            .to_string();

        Self {
            remote_path,
            file_name,
            file_stem,
            local_video_path: None,
            local_features_path: None,
            remote_features_path: None,
            duration: None,
            has_error: false,
            downloaded: false,
            read: false,
            features_extracted: false,
            features_uploaded: false,
            discovery_index,
            submeta: None,
        }
    }
}

/// The whole persistent pipeline state: the video table plus the group
/// assignment. Serialized as one snapshot after every mutating step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub records: Vec<VideoRecord>,
    pub groups: GroupState,
    /// Guards the one-time reordering step across restarts.
    pub reordered: bool,
}

impl PipelineState {
    /// Fresh table from an object-store listing; all flags start false.
    pub fn from_listing(remote_paths: Vec<String>) -> Self {
        let records = remote_paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| VideoRecord::new(path, i as u64))
            .collect();
        Self {
            records,
            groups: GroupState::default(),
            reordered: false,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The one-time reordering step: stable sort by duration descending,
    /// ties broken by ascending discovery index. After this the row index is
    /// frozen and used as item identity by the clustering engine.
    ///
    /// Refuses to run once any group exists: group state stores row indices,
    /// and permuting the table under them would corrupt the assignment.
    pub fn reorder_by_duration(&mut self) -> Result<(), PipelineError> {
        if !self.groups.is_empty() {
            return Err(PipelineError::ReorderAfterGrouping);
        }
        self.records.sort_by(|a, b| {
            b.duration
                .unwrap_or(0)
                .cmp(&a.duration.unwrap_or(0))
                .then(a.discovery_index.cmp(&b.discovery_index))
        });
        self.reordered = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_durations(durations: &[u64]) -> PipelineState {
        let paths = (0..durations.len())
            .map(|i| format!("videos/clip_{i}.mp4"))
            .collect();
        let mut state = PipelineState::from_listing(paths);
        for (record, &d) in state.records.iter_mut().zip(durations) {
            record.duration = Some(d);
        }
        state
    }

    #[test]
    fn from_listing_derives_names_and_identity() {
        let state =
            PipelineState::from_listing(vec!["dir/a.mp4".into(), "b.v1.avi".into()]);

        assert_eq!(state.len(), 2);
        assert_eq!(state.records[0].file_name, "a.mp4");
        assert_eq!(state.records[0].file_stem, "a");
        assert_eq!(state.records[1].file_name, "b.v1.avi");
        assert_eq!(state.records[1].file_stem, "b");
        assert_eq!(state.records[0].discovery_index, 0);
        assert_eq!(state.records[1].discovery_index, 1);
        assert!(!state.reordered);
    }

    #[test]
    fn reorder_sorts_longest_first() {
        let mut state = state_with_durations(&[10, 50, 30]);
        state.reorder_by_duration().unwrap();

        let durations: Vec<u64> = state.records.iter().map(|r| r.duration.unwrap()).collect();
        assert_eq!(durations, vec![50, 30, 10]);
        assert!(state.reordered);
        for pair in state.records.windows(2) {
            assert!(pair[0].duration >= pair[1].duration);
        }
    }

    #[test]
    fn reorder_keeps_rows_intact() {
        // Item identity must travel with every attribute of the row.
        let mut state = state_with_durations(&[10, 50, 30]);
        state.records[1].has_error = true;
        state.records[1].remote_features_path = Some("clip_1_features.json".into());
        state.reorder_by_duration().unwrap();

        let longest = &state.records[0];
        assert_eq!(longest.discovery_index, 1);
        assert_eq!(longest.remote_path, "videos/clip_1.mp4");
        assert!(longest.has_error);
        assert_eq!(
            longest.remote_features_path.as_deref(),
            Some("clip_1_features.json")
        );
    }

    #[test]
    fn equal_durations_tie_break_by_discovery_order() {
        let mut state = state_with_durations(&[30, 50, 30]);
        state.reorder_by_duration().unwrap();

        let ids: Vec<u64> = state.records.iter().map(|r| r.discovery_index).collect();
        assert_eq!(ids, vec![1, 0, 2]);
    }

    #[test]
    fn reorder_is_deterministic_when_repeated() {
        let mut a = state_with_durations(&[20, 20, 40, 20]);
        let mut b = a.clone();
        a.reorder_by_duration().unwrap();
        b.reorder_by_duration().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reorder_refuses_once_groups_exist() {
        let mut state = state_with_durations(&[10, 20]);
        state.groups.add_representative(0, "videos/clip_0.mp4".into());

        assert!(matches!(
            state.reorder_by_duration(),
            Err(PipelineError::ReorderAfterGrouping)
        ));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut state = state_with_durations(&[10, 20]);
        state.records[0].submeta = Some(crate::domain::submeta::SubMeta::snapshot(&[1]));
        state.groups.add_representative(1, "videos/clip_1.mp4".into());

        let bytes = serde_json::to_vec(&state).unwrap();
        let restored: PipelineState = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(state, restored);
    }
}
