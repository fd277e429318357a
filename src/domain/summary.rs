//! Aggregate progress counts derived from a content map.

use serde::{Deserialize, Serialize};

use super::content_map::{ContentMap, ItemStatus};

/// Progress counts for one content map.
///
/// Always recomputed by a full scan. Items in `processing` are counted as
/// queued: they are pending work, so `total_skippable` stays equal to
/// `completed + queued + failed`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total_skippable: usize,
    pub completed: usize,
    pub queued: usize,
    pub failed: usize,
    pub progress_percent: f64,
}

impl ProgressSummary {
    /// Scan a map and count its skippable items
    pub fn from_map(map: &ContentMap) -> Self {
        let mut completed = 0;
        let mut queued = 0;
        let mut failed = 0;

        for item in map.items().filter(|i| i.skippable) {
            match item.status {
                Some(ItemStatus::Completed) => completed += 1,
                Some(ItemStatus::Failed) => failed += 1,
                Some(ItemStatus::Queued) | Some(ItemStatus::Processing) | None => queued += 1,
            }
        }

        let total_skippable = completed + queued + failed;
        Self {
            total_skippable,
            completed,
            queued,
            failed,
            progress_percent: progress_percent(completed, total_skippable),
        }
    }
}

/// `completed / total * 100`, or 0 when there is nothing to complete
pub fn progress_percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}

/// Summarize a content map
pub fn summarize(map: &ContentMap) -> ProgressSummary {
    ProgressSummary::from_map(map)
}

impl std::fmt::Display for ProgressSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} completed ({:.1}%), {} queued, {} failed",
            self.completed, self.total_skippable, self.progress_percent, self.queued, self.failed
        )
    }
}
