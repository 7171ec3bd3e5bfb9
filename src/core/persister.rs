//! Asset persistence.
//!
//! Downloads each asset of a page and streams the body into
//! `<target>/<addressed name>`. Failures are per asset: the asset is logged
//! and skipped, and the rest of the page continues. Each asset's response and
//! file handle live only inside `persist_asset`, so both are closed before the
//! next asset starts, whichever way the previous one ended.

use std::path::{Path, PathBuf};

use reqwest::Client;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::domain::{AssetDescriptor, Page, PageSummary};

use super::addressing::addressed_path;

/// Why a single asset was skipped
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("asset has no source URL")]
    MissingUrl,

    #[error("request for {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("could not create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes asset bytes to content-addressed files
#[derive(Debug, Clone)]
pub struct AssetPersister {
    client: Client,
}

impl AssetPersister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Persist every asset of `page` under `target_directory`.
    ///
    /// The directory must already exist.
    pub async fn persist_page(&self, target_directory: &Path, page: Page) -> PageSummary {
        let mut summary = PageSummary::default();

        for asset in page {
            match self.persist_asset(target_directory, &asset).await {
                Ok(path) => {
                    debug!(path = %path.display(), name = %asset.display_name, "Downloaded asset");
                    summary.record_persisted();
                }
                Err(e) => {
                    warn!(url = %asset.source_url, error = %e, "Could not download asset, skipping");
                    summary.record_skipped();
                }
            }
        }

        summary
    }

    /// Download one asset, returning the path it was written to
    pub async fn persist_asset(
        &self,
        target_directory: &Path,
        asset: &AssetDescriptor,
    ) -> Result<PathBuf, PersistError> {
        if !asset.is_fetchable() {
            return Err(PersistError::MissingUrl);
        }
        let url = asset.source_url.as_str();

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| PersistError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PersistError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let path = addressed_path(target_directory, url);
        let mut file = File::create(&path)
            .await
            .map_err(|source| PersistError::Create {
                path: path.clone(),
                source,
            })?;

        let copied = async {
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|source| PersistError::Body {
                    url: url.to_string(),
                    source,
                })?
            {
                file.write_all(&chunk)
                    .await
                    .map_err(|source| PersistError::Write {
                        path: path.clone(),
                        source,
                    })?;
            }
            file.flush().await.map_err(|source| PersistError::Write {
                path: path.clone(),
                source,
            })
        }
        .await;

        if let Err(e) = copied {
            drop(file);
            // Leave nothing half-written behind for the next run to mistake
            if let Err(remove_err) = fs::remove_file(&path).await {
                debug!(path = %path.display(), error = %remove_err, "Could not remove partial file");
            }
            return Err(e);
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_blank_url_is_skipped_without_request() {
        let temp = TempDir::new().unwrap();
        let persister = AssetPersister::new(Client::new());

        let result = persister
            .persist_asset(temp.path(), &AssetDescriptor::new("", "nothing"))
            .await;
        assert!(matches!(result, Err(PersistError::MissingUrl)));

        let summary = persister
            .persist_page(temp.path(), Page::new(vec![AssetDescriptor::new(" ", "blank")]))
            .await;
        assert_eq!(summary, PageSummary { persisted: 0, skipped: 1 });
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let temp = TempDir::new().unwrap();
        let persister = AssetPersister::new(Client::new());

        // Port 9 on loopback: nothing listens there
        let asset = AssetDescriptor::new("http://127.0.0.1:9/a.png", "a");
        let result = persister.persist_asset(temp.path(), &asset).await;
        assert!(matches!(result, Err(PersistError::Request { .. })));
    }
}
