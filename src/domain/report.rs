//! Aggregated result of one pipeline run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{TaskFailure, TaskOutcome};

/// Summary of a coordinator run over a set of fetch tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run
    pub id: Uuid,

    /// Human label for what was downloaded (collection slug or owner)
    pub target: String,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the last task finished
    pub finished_at: Option<DateTime<Utc>>,

    /// Wall-clock time for the whole run
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,

    pub tasks_total: usize,
    pub tasks_succeeded: usize,
    pub empty_pages: usize,
    pub assets_persisted: usize,
    pub assets_skipped: usize,

    /// Highest number of tasks observed holding a slot at once
    pub peak_in_flight: usize,

    pub failures: Vec<TaskFailure>,
}

impl RunReport {
    /// Start an empty report for `tasks_total` tasks
    pub fn new(target: impl Into<String>, tasks_total: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: target.into(),
            started_at: Utc::now(),
            finished_at: None,
            elapsed: Duration::ZERO,
            tasks_total,
            tasks_succeeded: 0,
            empty_pages: 0,
            assets_persisted: 0,
            assets_skipped: 0,
            peak_in_flight: 0,
            failures: Vec::new(),
        }
    }

    /// Fold one task outcome into the totals
    pub fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Persisted { summary, .. } => {
                self.tasks_succeeded += 1;
                self.assets_persisted += summary.persisted;
                self.assets_skipped += summary.skipped;
            }
            TaskOutcome::EmptyPage { .. } => {
                self.tasks_succeeded += 1;
                self.empty_pages += 1;
            }
            TaskOutcome::Failed(failure) => self.failures.push(failure),
        }
    }

    /// Number of outcomes recorded so far
    pub fn tasks_completed(&self) -> usize {
        self.tasks_succeeded + self.failures.len()
    }

    pub fn tasks_failed(&self) -> usize {
        self.failures.len()
    }

    pub fn finish(&mut self, elapsed: Duration, peak_in_flight: usize) {
        self.elapsed = elapsed;
        self.peak_in_flight = peak_in_flight;
        self.finished_at = Some(Utc::now());
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::PageSummary;

    #[test]
    fn test_record_outcomes() {
        let mut report = RunReport::new("coolcats", 3);

        report.record(TaskOutcome::Persisted {
            page_url: "p1".to_string(),
            summary: PageSummary {
                persisted: 48,
                skipped: 2,
            },
        });
        report.record(TaskOutcome::EmptyPage {
            page_url: "p2".to_string(),
        });
        report.record(TaskOutcome::failed("p3", "page returned status 500"));

        assert_eq!(report.tasks_completed(), 3);
        assert_eq!(report.tasks_succeeded, 2);
        assert_eq!(report.empty_pages, 1);
        assert_eq!(report.assets_persisted, 48);
        assert_eq!(report.assets_skipped, 2);
        assert_eq!(report.tasks_failed(), 1);
        assert_eq!(report.failures[0].page_url, "p3");
    }

    #[test]
    fn test_report_serializes_elapsed_as_millis() {
        let mut report = RunReport::new("coolcats", 0);
        report.finish(Duration::from_millis(1500), 0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["elapsed"], 1500);
        assert_eq!(json["target"], "coolcats");
    }
}
