//! opensea-dl - bounded-concurrency downloader for OpenSea collections
//!
//! Resolves a collection (or everything an owner holds) into catalog page
//! requests, fetches the pages with a fixed number of workers, and writes
//! every referenced image to disk under a name derived from its URL.
//!
//! # Architecture
//!
//! - Every page becomes one task; all tasks start at once but only
//!   `workers` of them may hold a slot and talk to the network
//! - A throttled page (429) is retried exactly once after its Retry-After
//! - Failures stay local: a bad asset is skipped, a bad page fails only its
//!   own task, and the run ends with a report of both
//! - Filenames are a hash of the source URL, so re-runs overwrite
//!
//! # Modules
//!
//! - `adapters`: Catalog integrations (OpenSea)
//! - `core`: Pipeline (addressing, persister, fetcher, limiter, coordinator, resolver)
//! - `domain`: Data structures (AssetDescriptor, FetchTask, RunReport)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Download a collection into ./coolcats
//! opensea-dl collection "Cool Cats"
//!
//! # Download everything a wallet holds into ./<wallet>/<slug>
//! opensea-dl owner 0x1234...
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{CatalogClient, OpenSeaClient, OwnedCollection};
pub use crate::core::{ConcurrencyLimiter, Coordinator, PageFetcher, TargetResolver};
pub use domain::{AssetDescriptor, FetchTask, Page, RunReport, TaskOutcome};
