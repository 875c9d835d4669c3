use std::collections::BTreeMap;

use crate::types::{CommitStatus, StatusState};

/// Returns the checks whose most recent status report is a failure.
///
/// Reports are grouped by `context`; within a group the latest
/// `updated_at` wins. On equal timestamps the report listed first wins,
/// which matches the API returning statuses newest first. Each failing
/// check appears once, ordered by check name.
pub fn find_latest_failures(statuses: &[CommitStatus]) -> Vec<CommitStatus> {
    let mut latest: BTreeMap<&str, &CommitStatus> = BTreeMap::new();

    for status in statuses {
        latest
            .entry(status.context.as_str())
            .and_modify(|current| {
                if status.updated_at > current.updated_at {
                    *current = status;
                }
            })
            .or_insert(status);
    }

    latest
        .into_values()
        .filter(|status| status.state == StatusState::Failure)
        .cloned()
        .collect()
}
