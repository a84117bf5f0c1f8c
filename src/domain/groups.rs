use serde::{Deserialize, Serialize};

/// Discovered groups: one representative ("main") video plus the remote
/// paths of the clips it contains.
///
/// The three vectors are parallel, indexed by group number in discovery
/// order. `representative_indices` holds post-reorder row indices into the
/// video table and therefore must only ever be populated after the one-time
/// reordering step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupState {
    pub group_count: usize,
    pub representative_indices: Vec<usize>,
    pub representative_paths: Vec<String>,
    pub member_paths: Vec<Vec<String>>,
}

impl GroupState {
    pub fn is_empty(&self) -> bool {
        self.group_count == 0 && self.representative_indices.is_empty()
    }

    /// Open a new group with the video at `index` as its representative.
    pub fn add_representative(&mut self, index: usize, remote_path: String) {
        self.representative_indices.push(index);
        self.representative_paths.push(remote_path);
        self.member_paths.push(Vec::new());
        self.group_count += 1;
    }

    /// Absorb a clip into group `group_index`.
    pub fn add_member(&mut self, group_index: usize, remote_path: String) {
        self.member_paths[group_index].push(remote_path);
    }
}
