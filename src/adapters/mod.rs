//! Catalog interfaces for resolving what to download.
//!
//! A catalog answers the two lookups the pipeline needs before it can start:
//! how many items a collection holds, and which collections an owner holds.
//! It also knows how to spell page URLs for its own listing endpoint.

pub mod opensea;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use opensea::{OpenSeaClient, DEFAULT_API_BASE};

/// A collection held by an owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedCollection {
    /// Collection slug (used as the output subdirectory)
    pub slug: String,

    /// Contract addresses backing the collection, primary first
    pub contracts: Vec<String>,
}

impl OwnedCollection {
    pub fn primary_contract(&self) -> Option<&str> {
        self.contracts.first().map(String::as_str)
    }
}

/// Trait for asset catalogs
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Human-readable catalog name
    fn name(&self) -> &str;

    /// Total number of items in a collection
    async fn collection_total(&self, slug: &str) -> Result<f64>;

    /// Collections held by `owner`
    async fn owner_collections(&self, owner: &str) -> Result<Vec<OwnedCollection>>;

    /// URL of one page of a collection listing
    fn collection_page_url(&self, slug: &str, offset: u64, limit: u64) -> String;

    /// URL of the first page of an owner's assets under one contract
    fn owner_page_url(&self, owner: &str, contract: &str, limit: u64) -> String;
}
