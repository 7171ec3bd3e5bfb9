//! Fetch tasks and their outcomes.
//!
//! A FetchTask names one catalog page and the directory its assets land in.
//! Each task produces exactly one TaskOutcome, which the coordinator folds
//! into the run report.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One catalog page to fetch and persist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchTask {
    /// Catalog page URL
    pub page_url: String,

    /// Directory the page's assets are written to (must already exist)
    pub target_directory: PathBuf,
}

impl FetchTask {
    pub fn new(page_url: impl Into<String>, target_directory: impl Into<PathBuf>) -> Self {
        Self {
            page_url: page_url.into(),
            target_directory: target_directory.into(),
        }
    }

    pub fn target_directory(&self) -> &Path {
        &self.target_directory
    }
}

/// Per-asset tally for one persisted page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    /// Assets written to disk
    pub persisted: usize,

    /// Assets skipped after a request, status, or file error
    pub skipped: usize,
}

impl PageSummary {
    pub fn record_persisted(&mut self) {
        self.persisted += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }
}

/// A task that ended without persisting its page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub page_url: String,
    pub reason: String,
}

/// Result of running one FetchTask to completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Page fetched and handed to the persister
    Persisted { page_url: String, summary: PageSummary },

    /// Page decoded but held no assets
    EmptyPage { page_url: String },

    /// Page could not be fetched or decoded
    Failed(TaskFailure),
}

impl TaskOutcome {
    pub fn failed(page_url: impl Into<String>, reason: impl ToString) -> Self {
        TaskOutcome::Failed(TaskFailure {
            page_url: page_url.into(),
            reason: reason.to_string(),
        })
    }

    pub fn page_url(&self) -> &str {
        match self {
            TaskOutcome::Persisted { page_url, .. } => page_url,
            TaskOutcome::EmptyPage { page_url } => page_url,
            TaskOutcome::Failed(failure) => &failure.page_url,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskOutcome::Failed(_))
    }
}
