//! Rate-limited page fetching.
//!
//! Fetches one catalog page, retrying exactly once when the catalog answers
//! 429 Too Many Requests, then hands the decoded page to the persister.
//! Every other failure (transport, unexpected status, undecodable body) ends
//! the task with a `TaskOutcome::Failed` and leaves the rest of the run alone.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{FetchTask, Page, TaskOutcome};

use super::persister::AssetPersister;

/// Default ceiling on a single Retry-After wait
pub const DEFAULT_MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

/// Why a page could not be turned into assets
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for page failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("page returned status {0}")]
    Status(u16),

    #[error("page still throttled after retrying once")]
    Throttled,

    #[error("could not read page body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("could not decode page: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Seconds to wait according to a Retry-After value.
///
/// Only the delta-seconds form is understood; anything missing or
/// unparseable counts as zero.
pub fn retry_after_seconds(value: Option<&str>) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Fetches catalog pages and delegates their assets to an `AssetPersister`
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    persister: AssetPersister,
    max_retry_after: Duration,
}

impl PageFetcher {
    /// Create a fetcher sharing `client` with its persister
    pub fn new(client: Client) -> Self {
        Self {
            persister: AssetPersister::new(client.clone()),
            client,
            max_retry_after: DEFAULT_MAX_RETRY_AFTER,
        }
    }

    /// Cap the time spent honoring a single Retry-After header
    pub fn with_max_retry_after(mut self, max_retry_after: Duration) -> Self {
        self.max_retry_after = max_retry_after;
        self
    }

    /// Fetch the task's page and persist its assets
    #[instrument(skip(self, task), fields(page_url = %task.page_url))]
    pub async fn run(&self, task: &FetchTask) -> TaskOutcome {
        let page = match self.fetch_page(&task.page_url).await {
            Ok(page) => page,
            Err(e) => {
                error!(error = %e, "Page fetch failed");
                return TaskOutcome::failed(task.page_url.clone(), e);
            }
        };

        if page.is_empty() {
            info!("Page returned no assets");
            return TaskOutcome::EmptyPage {
                page_url: task.page_url.clone(),
            };
        }

        debug!(assets = page.len(), "Persisting page");
        let summary = self
            .persister
            .persist_page(task.target_directory(), page)
            .await;

        TaskOutcome::Persisted {
            page_url: task.page_url.clone(),
            summary,
        }
    }

    /// GET a page, honoring one round of throttling, and decode it
    pub async fn fetch_page(&self, page_url: &str) -> Result<Page, FetchError> {
        let mut response = self.get(page_url).await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let wait = self.retry_delay(response.headers());
            warn!(wait_secs = wait.as_secs(), "Throttled by catalog, retrying once");
            drop(response);

            tokio::time::sleep(wait).await;

            response = self.get(page_url).await?;
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                return Err(FetchError::Throttled);
            }
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(FetchError::Body)?;
        Ok(Page::from_json(&body)?)
    }

    async fn get(&self, url: &str) -> Result<Response, FetchError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(FetchError::Request)
    }

    fn retry_delay(&self, headers: &HeaderMap) -> Duration {
        let value = headers.get(RETRY_AFTER).and_then(|v| v.to_str().ok());
        let requested = Duration::from_secs(retry_after_seconds(value));

        if requested > self.max_retry_after {
            warn!(
                requested_secs = requested.as_secs(),
                max_secs = self.max_retry_after.as_secs(),
                "Retry-After exceeds limit, clamping"
            );
            self.max_retry_after
        } else {
            requested
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_retry_after_parsing() {
        assert_eq!(retry_after_seconds(Some("2")), 2);
        assert_eq!(retry_after_seconds(Some(" 30 ")), 30);
        assert_eq!(retry_after_seconds(None), 0);
        assert_eq!(retry_after_seconds(Some("")), 0);
        assert_eq!(retry_after_seconds(Some("soon")), 0);
        assert_eq!(retry_after_seconds(Some("-5")), 0);
        assert_eq!(
            retry_after_seconds(Some("Wed, 21 Oct 2015 07:28:00 GMT")),
            0
        );
    }

    #[test]
    fn test_retry_delay_is_clamped() {
        let fetcher = PageFetcher::new(Client::new()).with_max_retry_after(Duration::from_secs(10));

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("3600"));
        assert_eq!(fetcher.retry_delay(&headers), Duration::from_secs(10));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(fetcher.retry_delay(&headers), Duration::from_secs(2));

        assert_eq!(fetcher.retry_delay(&HeaderMap::new()), Duration::ZERO);
    }
}
