use std::fmt;

use crate::domain::meta::PipelineState;

/// One discovered group: the representative and the clips it contains.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoGroup {
    pub representative: String,
    pub members: Vec<String>,
}

/// Final outcome assembled from the checkpointed state: the group
/// assignment plus the items that failed to decode.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupReport {
    /// Number of items clustering has reached so far.
    pub processed: usize,
    pub groups: Vec<VideoGroup>,
    pub failed_to_process: Vec<String>,
}

impl DedupReport {
    pub fn from_state(state: &PipelineState) -> Self {
        let groups = state
            .groups
            .representative_paths
            .iter()
            .zip(&state.groups.member_paths)
            .map(|(representative, members)| VideoGroup {
                representative: representative.clone(),
                members: members.clone(),
            })
            .collect();

        let failed_to_process = state
            .records
            .iter()
            .filter(|r| r.has_error)
            .map(|r| r.remote_path.clone())
            .collect();

        Self {
            processed: state.records.iter().filter(|r| r.submeta.is_some()).count(),
            groups,
            failed_to_process,
        }
    }
}

impl fmt::Display for DedupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processed {} videos.", self.processed)?;
        for group in &self.groups {
            if group.members.is_empty() {
                continue;
            }
            writeln!(f, "Main video = {}, its sub-clips:", group.representative)?;
            for member in &group.members {
                writeln!(f, "\t{member}")?;
            }
            writeln!(f)?;
        }
        if !self.failed_to_process.is_empty() {
            writeln!(f, "Failed to process:")?;
            for path in &self.failed_to_process {
                writeln!(f, "\t{path}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_splits_groups_and_failures() {
        let mut state =
            PipelineState::from_listing(vec!["a.mp4".into(), "b.mp4".into(), "c.mp4".into()]);
        state.records[2].has_error = true;
        state.groups.add_representative(0, "a.mp4".into());
        state.groups.add_member(0, "b.mp4".into());
        state.records[0].submeta = Some(crate::domain::submeta::SubMeta::snapshot(&[]));
        state.records[1].submeta = Some(crate::domain::submeta::SubMeta::snapshot(&[0]));

        let report = DedupReport::from_state(&state);
        assert_eq!(report.processed, 2);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].representative, "a.mp4");
        assert_eq!(report.groups[0].members, vec!["b.mp4"]);
        assert_eq!(report.failed_to_process, vec!["c.mp4"]);
    }

    #[test]
    fn display_skips_singleton_groups() {
        let report = DedupReport {
            processed: 2,
            groups: vec![
                VideoGroup {
                    representative: "solo.mp4".into(),
                    members: vec![],
                },
                VideoGroup {
                    representative: "main.mp4".into(),
                    members: vec!["part.mp4".into()],
                },
            ],
            failed_to_process: vec!["broken.mp4".into()],
        };

        let text = report.to_string();
        assert!(!text.contains("solo.mp4"));
        assert!(text.contains("main.mp4"));
        assert!(text.contains("\tpart.mp4"));
        assert!(text.contains("broken.mp4"));
    }
}
