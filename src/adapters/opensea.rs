//! OpenSea REST catalog.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{CatalogClient, OwnedCollection};

/// Public v1 API root
pub const DEFAULT_API_BASE: &str = "https://api.opensea.io/api/v1";

/// Most collections the owner lookup asks for in one call
const OWNER_COLLECTIONS_LIMIT: u64 = 300;

/// OpenSea API client
#[derive(Debug, Clone)]
pub struct OpenSeaClient {
    /// API root, e.g. https://api.opensea.io/api/v1
    base: Url,
    /// HTTP client
    client: Client,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    stats: Stats,
}

#[derive(Debug, Deserialize)]
struct Stats {
    #[serde(default)]
    total_supply: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    slug: String,
    #[serde(default)]
    primary_asset_contracts: Vec<ContractResponse>,
}

#[derive(Debug, Deserialize)]
struct ContractResponse {
    address: String,
}

impl From<CollectionResponse> for OwnedCollection {
    fn from(c: CollectionResponse) -> Self {
        Self {
            slug: c.slug,
            contracts: c
                .primary_asset_contracts
                .into_iter()
                .map(|a| a.address)
                .collect(),
        }
    }
}

impl OpenSeaClient {
    /// Create a client rooted at `api_base`
    pub fn new(api_base: &str, client: Client) -> Result<Self> {
        let base = Url::parse(api_base)
            .with_context(|| format!("Invalid catalog API base URL: {}", api_base))?;

        if base.cannot_be_a_base() {
            anyhow::bail!("Catalog API base URL cannot carry a path: {}", api_base);
        }

        Ok(Self { base, client })
    }

    /// Build an endpoint URL from path segments and query pairs
    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url, what: &str) -> Result<T> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to request {}", what))?
            .error_for_status()
            .with_context(|| format!("Catalog rejected {} request", what))?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response from {}", what, url))
    }
}

#[async_trait]
impl CatalogClient for OpenSeaClient {
    fn name(&self) -> &str {
        "opensea"
    }

    async fn collection_total(&self, slug: &str) -> Result<f64> {
        let url = self.endpoint(&["collection", slug, "stats"], &[]);
        let stats: StatsResponse = self.get_json(url, "collection stats").await?;
        Ok(stats.stats.total_supply.unwrap_or(0.0))
    }

    async fn owner_collections(&self, owner: &str) -> Result<Vec<OwnedCollection>> {
        let url = self.endpoint(
            &["collections"],
            &[
                ("asset_owner", owner.to_string()),
                ("offset", "0".to_string()),
                ("limit", OWNER_COLLECTIONS_LIMIT.to_string()),
            ],
        );
        let collections: Vec<CollectionResponse> =
            self.get_json(url, "owner collections").await?;
        Ok(collections.into_iter().map(OwnedCollection::from).collect())
    }

    fn collection_page_url(&self, slug: &str, offset: u64, limit: u64) -> String {
        self.endpoint(
            &["assets"],
            &[
                ("order_direction", "desc".to_string()),
                ("offset", offset.to_string()),
                ("collection", slug.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .into()
    }

    fn owner_page_url(&self, owner: &str, contract: &str, limit: u64) -> String {
        self.endpoint(
            &["assets"],
            &[
                ("owner", owner.to_string()),
                ("asset_contract_address", contract.to_string()),
                ("order_direction", "desc".to_string()),
                ("offset", "0".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenSeaClient {
        OpenSeaClient::new(DEFAULT_API_BASE, Client::new()).unwrap()
    }

    #[test]
    fn test_collection_page_url() {
        assert_eq!(
            client().collection_page_url("coolcats", 100, 50),
            "https://api.opensea.io/api/v1/assets?order_direction=desc&offset=100&collection=coolcats&limit=50"
        );
    }

    #[test]
    fn test_owner_page_url() {
        assert_eq!(
            client().owner_page_url("0xabc", "0xdef", 50),
            "https://api.opensea.io/api/v1/assets?owner=0xabc&asset_contract_address=0xdef&order_direction=desc&offset=0&limit=50"
        );
    }

    #[test]
    fn test_trailing_slash_base() {
        let c = OpenSeaClient::new("http://localhost:8080/api/v1/", Client::new()).unwrap();
        assert_eq!(
            c.endpoint(&["collection", "cool cats", "stats"], &[]).as_str(),
            "http://localhost:8080/api/v1/collection/cool%20cats/stats"
        );
    }

    #[test]
    fn test_invalid_base() {
        assert!(OpenSeaClient::new("not a url", Client::new()).is_err());
        assert!(OpenSeaClient::new("mailto:someone@example.com", Client::new()).is_err());
    }

    #[test]
    fn test_collection_response_mapping() {
        let json = r#"[{"slug":"coolcats","primary_asset_contracts":[{"address":"0x1"},{"address":"0x2"}]},{"slug":"shared"}]"#;
        let parsed: Vec<CollectionResponse> = serde_json::from_str(json).unwrap();
        let collections: Vec<OwnedCollection> = parsed.into_iter().map(Into::into).collect();

        assert_eq!(collections[0].primary_contract(), Some("0x1"));
        assert_eq!(collections[1].primary_contract(), None);
    }
}
