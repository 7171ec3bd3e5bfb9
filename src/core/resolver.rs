//! Target resolution.
//!
//! Turns a collection name or an owner address into the output directories
//! and the page tasks the coordinator runs. Directories are created here,
//! before any task exists, with a single idempotent create-all call.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::adapters::CatalogClient;
use crate::domain::FetchTask;

/// Assets requested per catalog page
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Most pages a single collection run will schedule
pub const MAX_PAGES: u64 = 10_000;

/// Everything needed to start a run
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// Collection slug or owner address
    pub label: String,

    /// One task per page, in page order
    pub tasks: Vec<FetchTask>,
}

impl ResolvedTarget {
    pub fn expected_pages(&self) -> usize {
        self.tasks.len()
    }
}

/// Lowercase a collection name and strip all whitespace
pub fn normalize_slug(name: &str) -> String {
    name.split_whitespace()
        .collect::<String>()
        .to_lowercase()
}

/// Pages needed to cover `total` items at `page_size` per page
pub fn page_count(total: f64, page_size: u64) -> u64 {
    if page_size == 0 || !total.is_finite() || total <= 0.0 {
        return 0;
    }
    (total / page_size as f64).ceil() as u64
}

/// Check that `value` names exactly one directory below its parent.
///
/// Rejects empty values, `.`, `..`, roots, drive prefixes and anything
/// containing a path separator.
pub fn safe_component(value: &str) -> Result<&str> {
    if value.is_empty() || value.contains('/') || value.contains('\\') {
        anyhow::bail!("Not a usable directory name: {:?}", value);
    }

    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(value),
        _ => anyhow::bail!("Not a usable directory name: {:?}", value),
    }
}

/// Resolves download targets against a catalog
#[derive(Clone)]
pub struct TargetResolver {
    catalog: Arc<dyn CatalogClient>,
    output: PathBuf,
    page_size: u64,
}

impl TargetResolver {
    pub fn new(catalog: Arc<dyn CatalogClient>, output: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            output: output.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Resolve every page of a collection into `<output>/<slug>`
    pub async fn resolve_collection(&self, name: &str) -> Result<ResolvedTarget> {
        let slug = normalize_slug(name);
        if slug.is_empty() {
            anyhow::bail!("Collection name is empty");
        }
        safe_component(&slug)?;

        let total = self
            .catalog
            .collection_total(&slug)
            .await
            .with_context(|| format!("Failed to look up collection '{}'", slug))?;

        let mut pages = page_count(total, self.page_size);
        if pages > MAX_PAGES {
            warn!(%slug, total, pages, max = MAX_PAGES, "Catalog reports too many pages, capping");
            pages = MAX_PAGES;
        }
        info!(%slug, total, pages, catalog = self.catalog.name(), "Resolved collection");

        let target = self.output.join(&slug);
        ensure_dir(&target).await?;

        let tasks = (0..pages)
            .map_while(|i| {
                let offset = i.checked_mul(self.page_size)?;
                let url = self
                    .catalog
                    .collection_page_url(&slug, offset, self.page_size);
                Some(FetchTask::new(url, target.clone()))
            })
            .collect();

        Ok(ResolvedTarget { label: slug, tasks })
    }

    /// Resolve the first page of each collection `owner` holds into
    /// `<output>/<owner>/<slug>`
    pub async fn resolve_owner(&self, owner: &str) -> Result<ResolvedTarget> {
        let owner = owner.trim();
        if owner.is_empty() {
            anyhow::bail!("Owner address is empty");
        }
        safe_component(owner)?;

        let collections = self
            .catalog
            .owner_collections(owner)
            .await
            .with_context(|| format!("Failed to look up collections of {}", owner))?;

        info!(%owner, collections = collections.len(), "Resolved owner");

        let mut tasks = Vec::new();
        for collection in collections {
            let Some(contract) = collection.primary_contract() else {
                debug!(slug = %collection.slug, "Collection has no primary contract, skipping");
                continue;
            };

            if let Err(e) = safe_component(&collection.slug) {
                warn!(error = %e, "Collection slug is not a safe directory name, skipping");
                continue;
            }

            let target = self.output.join(owner).join(&collection.slug);
            ensure_dir(&target).await?;

            let url = self.catalog.owner_page_url(owner, contract, self.page_size);
            tasks.push(FetchTask::new(url, target));
        }

        Ok(ResolvedTarget {
            label: owner.to_string(),
            tasks,
        })
    }
}

async fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .with_context(|| format!("Failed to create directory: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_slug() {
        assert_eq!(normalize_slug("Cool Cats"), "coolcats");
        assert_eq!(normalize_slug("  Bored Ape  Yacht\tClub "), "boredapeyachtclub");
        assert_eq!(normalize_slug("doodles-official"), "doodles-official");
        assert_eq!(normalize_slug("   "), "");
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(120.0, 50), 3);
        assert_eq!(page_count(100.0, 50), 2);
        assert_eq!(page_count(1.0, 50), 1);
        assert_eq!(page_count(0.0, 50), 0);
        assert_eq!(page_count(-3.0, 50), 0);
        assert_eq!(page_count(f64::NAN, 50), 0);
        assert_eq!(page_count(10.0, 0), 0);
    }

    #[test]
    fn test_safe_component() {
        assert_eq!(safe_component("coolcats").unwrap(), "coolcats");
        assert_eq!(safe_component("0xAbC123").unwrap(), "0xAbC123");
        assert_eq!(safe_component("doodles-official").unwrap(), "doodles-official");

        assert!(safe_component("").is_err());
        assert!(safe_component(".").is_err());
        assert!(safe_component("..").is_err());
        assert!(safe_component("/etc").is_err());
        assert!(safe_component("../../escaped").is_err());
        assert!(safe_component("a/b").is_err());
        assert!(safe_component("a\\b").is_err());
    }
}
