//! Domain types for the downloader.
//!
//! This module contains the core data structures:
//! - Asset: descriptors and pages decoded from the catalog
//! - Task: one page fetch and its outcome
//! - Report: aggregated run results

pub mod asset;
pub mod report;
pub mod task;

// Re-export commonly used types
pub use asset::{AssetDescriptor, Page, PageResponse};
pub use report::RunReport;
pub use task::{FetchTask, PageSummary, TaskFailure, TaskOutcome};
