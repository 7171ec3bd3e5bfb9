//! Core download pipeline.
//!
//! This module contains:
//! - Addressing: URL to filename mapping
//! - Persister: per-asset download to disk
//! - Fetcher: page fetch with one throttling retry
//! - Limiter: the concurrency budget
//! - Coordinator: runs all page tasks under the budget
//! - Resolver: turns a collection or owner into page tasks

pub mod addressing;
pub mod coordinator;
pub mod fetcher;
pub mod limiter;
pub mod persister;
pub mod resolver;

// Re-export commonly used types
pub use addressing::{addressed_name, addressed_path, url_digest};
pub use coordinator::Coordinator;
pub use fetcher::{retry_after_seconds, FetchError, PageFetcher, DEFAULT_MAX_RETRY_AFTER};
pub use limiter::{ConcurrencyLimiter, LimiterClosed, Slot, DEFAULT_WORKERS};
pub use persister::{AssetPersister, PersistError};
pub use resolver::{
    normalize_slug, page_count, safe_component, ResolvedTarget, TargetResolver, DEFAULT_PAGE_SIZE,
    MAX_PAGES,
};
