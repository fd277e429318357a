//! Outcomes of processing courses and specializations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::summary::ProgressSummary;

/// How a course or specialization is judged successful
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessPolicy {
    /// At least one item (or course) succeeded. A course with nothing left
    /// to complete also counts as processed.
    #[default]
    Lenient,

    /// No item failed or is still queued; every course in a specialization
    /// was processed.
    Strict,
}

/// Result of walking one course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseReport {
    pub course_slug: String,

    pub specialization_slug: Option<String>,

    /// Whether an existing progress document was picked up
    pub resumed: bool,

    /// Completion calls made during this run
    pub attempted: usize,

    /// Items completed during this run
    pub completed: usize,

    /// Items failed during this run
    pub failed: usize,

    /// Items put back in the queue after an interrupted run
    pub requeued: usize,

    /// Saves that did not reach disk
    pub save_failures: usize,

    /// Map-wide counts after the run
    pub summary: ProgressSummary,
}

impl CourseReport {
    pub fn is_success(&self, policy: SuccessPolicy) -> bool {
        match policy {
            SuccessPolicy::Lenient => {
                self.summary.completed > 0 || self.summary.total_skippable == 0
            }
            SuccessPolicy::Strict => self.summary.failed == 0 && self.summary.queued == 0,
        }
    }
}

/// A course inside a specialization that could not be walked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseFailure {
    pub course_slug: String,
    pub error: String,
}

/// Result of walking every course of a specialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecializationReport {
    pub specialization_slug: String,
    pub courses: Vec<CourseReport>,
    pub failures: Vec<CourseFailure>,
    pub skipped: Vec<String>,
}

impl SpecializationReport {
    pub fn new(specialization_slug: impl Into<String>) -> Self {
        Self {
            specialization_slug: specialization_slug.into(),
            ..Default::default()
        }
    }

    pub fn is_success(&self, policy: SuccessPolicy) -> bool {
        match policy {
            SuccessPolicy::Lenient => self.courses.iter().any(|c| c.is_success(policy)),
            SuccessPolicy::Strict => {
                self.failures.is_empty()
                    && !self.courses.is_empty()
                    && self.courses.iter().all(|c| c.is_success(policy))
            }
        }
    }
}

/// Result of `process_content`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ContentReport {
    Course(CourseReport),
    Specialization(SpecializationReport),
    /// The target is on a skip list
    Skipped { slug: String },
}

impl ContentReport {
    pub fn is_success(&self, policy: SuccessPolicy) -> bool {
        match self {
            Self::Course(report) => report.is_success(policy),
            Self::Specialization(report) => report.is_success(policy),
            Self::Skipped { .. } => false,
        }
    }
}

/// Totals for a batch of targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub processed: usize,
    pub failed: usize,
    /// Targets on a skip list; neither processed nor failed
    #[serde(default)]
    pub skipped: usize,
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            processed: 0,
            failed: 0,
            skipped: 0,
        }
    }

    pub fn record(&mut self, success: bool) {
        if success {
            self.processed += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::summary::progress_percent;

    fn report(completed: usize, queued: usize, failed: usize) -> CourseReport {
        let total = completed + queued + failed;
        CourseReport {
            course_slug: "c".to_string(),
            specialization_slug: None,
            resumed: false,
            attempted: 0,
            completed: 0,
            failed: 0,
            requeued: 0,
            save_failures: 0,
            summary: ProgressSummary {
                total_skippable: total,
                completed,
                queued,
                failed,
                progress_percent: progress_percent(completed, total),
            },
        }
    }

    #[test]
    fn test_lenient_course_success() {
        assert!(report(1, 0, 3).is_success(SuccessPolicy::Lenient));
        assert!(report(0, 0, 0).is_success(SuccessPolicy::Lenient));
        assert!(!report(0, 0, 2).is_success(SuccessPolicy::Lenient));
    }

    #[test]
    fn test_strict_course_success() {
        assert!(report(4, 0, 0).is_success(SuccessPolicy::Strict));
        assert!(!report(3, 0, 1).is_success(SuccessPolicy::Strict));
        assert!(!report(3, 1, 0).is_success(SuccessPolicy::Strict));
    }

    #[test]
    fn test_specialization_policies() {
        let mut spec = SpecializationReport::new("data-science");
        spec.courses.push(report(2, 0, 0));
        spec.failures.push(CourseFailure {
            course_slug: "broken".to_string(),
            error: "not found".to_string(),
        });

        assert!(spec.is_success(SuccessPolicy::Lenient));
        assert!(!spec.is_success(SuccessPolicy::Strict));
    }

    #[test]
    fn test_skipped_is_not_success() {
        let skipped = ContentReport::Skipped {
            slug: "x".to_string(),
        };
        assert!(!skipped.is_success(SuccessPolicy::Lenient));
    }

    #[test]
    fn test_batch_counts_skips_apart() {
        let mut batch = BatchReport::new();
        batch.record(true);
        batch.record(false);
        batch.record_skipped();

        assert_eq!((batch.processed, batch.failed, batch.skipped), (1, 1, 1));
    }
}
