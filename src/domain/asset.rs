//! Asset descriptors as returned by the catalog's paginated listing.

use serde::{Deserialize, Deserializer, Serialize};

/// One downloadable asset from a catalog page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Where the image bytes live
    #[serde(rename = "image_url", default, deserialize_with = "null_as_empty")]
    pub source_url: String,

    /// Display name (informational only)
    #[serde(rename = "name", default, deserialize_with = "null_as_empty")]
    pub display_name: String,
}

// The catalog sends `null` for assets without media
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl AssetDescriptor {
    pub fn new(source_url: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            display_name: display_name.into(),
        }
    }

    /// Whether there is anything to fetch
    pub fn is_fetchable(&self) -> bool {
        !self.source_url.trim().is_empty()
    }
}

/// Wire shape of a page response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub assets: Vec<AssetDescriptor>,
}

/// Ordered batch of assets produced by one page request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    assets: Vec<AssetDescriptor>,
}

impl Page {
    pub fn new(assets: Vec<AssetDescriptor>) -> Self {
        Self { assets }
    }

    /// Decode a page body
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let response: PageResponse = serde_json::from_slice(body)?;
        Ok(response.into())
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn assets(&self) -> &[AssetDescriptor] {
        &self.assets
    }
}

impl From<PageResponse> for Page {
    fn from(response: PageResponse) -> Self {
        Self::new(response.assets)
    }
}

impl IntoIterator for Page {
    type Item = AssetDescriptor;
    type IntoIter = std::vec::IntoIter<AssetDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.assets.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_page() {
        let body = br#"{"assets":[{"image_url":"https://img.example/1.png","name":"One","token_id":"1"},{"image_url":"https://img.example/2.png"}]}"#;
        let page = Page::from_json(body).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.assets()[0].source_url, "https://img.example/1.png");
        assert_eq!(page.assets()[0].display_name, "One");
        assert_eq!(page.assets()[1].display_name, "");
    }

    #[test]
    fn test_null_fields_decode_as_empty() {
        let body = br#"{"assets":[{"image_url":null,"name":null}]}"#;
        let page = Page::from_json(body).unwrap();
        assert_eq!(page.len(), 1);
        assert!(!page.assets()[0].is_fetchable());
    }

    #[test]
    fn test_missing_assets_is_empty_page() {
        let page = Page::from_json(b"{}").unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_malformed_body() {
        assert!(Page::from_json(b"<html>rate limited</html>").is_err());
    }

    #[test]
    fn test_fetchable() {
        assert!(AssetDescriptor::new("https://img.example/a", "a").is_fetchable());
        assert!(!AssetDescriptor::new("  ", "blank").is_fetchable());
    }
}
