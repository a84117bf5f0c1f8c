use serde::{Deserialize, Serialize};

/// Per-item bookkeeping of comparison progress against a frozen snapshot of
/// the group representatives.
///
/// Created lazily when clustering first reaches the item. The snapshot is an
/// owned copy of the representative indices known at that moment; a
/// representative discovered later is never a candidate for this item, since
/// clustering runs longest-first and a later representative is guaranteed to
/// be no longer than this item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubMeta {
    pub current_downloaded: bool,
    pub current_compared: bool,
    /// Post-reorder table indices of the candidate representatives.
    pub representative_indices: Vec<usize>,
    pub representative_downloaded: Vec<bool>,
    pub representative_compared: Vec<bool>,
    /// Outcome per candidate. Initialized all-true: entries the loop never
    /// reached (because an earlier candidate matched) must not read as "no
    /// representative matched" when deciding whether to open a new group.
    pub is_similar_to_representative: Vec<bool>,
}

/// Where an item currently stands in its comparison lifecycle, derived from
/// the checkpointed flags. Resumption re-enters at exactly this phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparePhase {
    /// The item's own feature blob still has to be fetched.
    Downloading,
    /// Comparing against the candidate at this snapshot position.
    Comparing(usize),
    /// Outcome recorded: joined the group at this snapshot position.
    Joined(usize),
    /// Outcome recorded: no candidate matched, the item leads its own group.
    Exhausted,
    /// All comparison work for this item is done and checkpointed.
    Done,
}

impl SubMeta {
    /// Snapshot the representatives discovered so far for a new item.
    pub fn snapshot(representative_indices: &[usize]) -> Self {
        let n = representative_indices.len();
        Self {
            current_downloaded: false,
            current_compared: false,
            representative_indices: representative_indices.to_vec(),
            representative_downloaded: vec![false; n],
            representative_compared: vec![false; n],
            is_similar_to_representative: vec![true; n],
        }
    }

    /// Submeta for an item that never takes part in comparison (decode
    /// error). Marked complete from the start so resumption skips it.
    pub fn closed() -> Self {
        Self {
            current_downloaded: false,
            current_compared: true,
            representative_indices: Vec::new(),
            representative_downloaded: Vec::new(),
            representative_compared: Vec::new(),
            is_similar_to_representative: Vec::new(),
        }
    }

    pub fn candidate_count(&self) -> usize {
        self.representative_indices.len()
    }

    /// First snapshot position with a recorded, positive outcome.
    pub fn recorded_match(&self) -> Option<usize> {
        (0..self.candidate_count())
            .find(|&k| self.representative_compared[k] && self.is_similar_to_representative[k])
    }

    /// True when every recorded outcome was negative (vacuously true for an
    /// empty snapshot): the item must become a representative itself.
    pub fn matched_none(&self) -> bool {
        self.is_similar_to_representative.iter().all(|&s| !s)
    }

    pub fn phase(&self) -> ComparePhase {
        if self.current_compared {
            return ComparePhase::Done;
        }
        if !self.current_downloaded {
            return ComparePhase::Downloading;
        }
        if let Some(k) = self.recorded_match() {
            return ComparePhase::Joined(k);
        }
        match (0..self.candidate_count()).find(|&k| !self.representative_compared[k]) {
            Some(k) => ComparePhase::Comparing(k),
            None => ComparePhase::Exhausted,
        }
    }
}
