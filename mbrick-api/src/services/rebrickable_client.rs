//! Rebrickable catalog client
//!
//! Read-only, key-authenticated lookups of sets, set part lists and parts.
//! Every non-success status and every undecodable body is reported as
//! `Error::Upstream`.

use async_trait::async_trait;
use mbrick_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("MissingBrick/", env!("CARGO_PKG_VERSION"));

/// Catalog set record
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogSet {
    pub set_num: String,
    pub name: String,
    #[serde(default)]
    pub year: i64,
    #[serde(default)]
    pub theme_id: i64,
    #[serde(default)]
    pub num_parts: i64,
    #[serde(default)]
    pub set_img_url: Option<String>,
    #[serde(default)]
    pub set_url: Option<String>,
    /// RFC3339 timestamp, parsed leniently by the caller
    #[serde(default)]
    pub last_modified_dt: Option<String>,
}

/// Catalog part record
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogPart {
    pub part_num: String,
    pub name: String,
    #[serde(default)]
    pub part_cat_id: i64,
    #[serde(default)]
    pub part_img_url: Option<String>,
    #[serde(default)]
    pub part_url: Option<String>,
    /// Map of external catalogs to their ids, kept unstructured
    #[serde(default)]
    pub external_ids: serde_json::Value,
    #[serde(default)]
    pub print_of: Option<String>,
}

/// Catalog color record
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogColor {
    pub id: i64,
    pub name: String,
    /// Hex RGB without leading '#'
    #[serde(default)]
    pub rgb: String,
    #[serde(default)]
    pub is_trans: bool,
}

/// One entry of a set's part list
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogSetPart {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub inv_part_id: i64,
    pub part: CatalogPart,
    pub color: CatalogColor,
    pub quantity: i64,
    #[serde(default)]
    pub is_spare: bool,
    #[serde(default)]
    pub num_sets: i64,
}

#[derive(Debug, Deserialize)]
struct SetPartsPage {
    results: Vec<CatalogSetPart>,
}

/// External read-only catalog of sets and parts
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch set metadata by set number
    async fn get_set(&self, set_num: &str) -> Result<CatalogSet>;

    /// Fetch the full part list of a set, minifig parts included
    async fn get_set_parts(&self, set_num: &str) -> Result<Vec<CatalogSetPart>>;

    /// Fetch a single part by part number
    async fn get_part(&self, part_num: &str) -> Result<CatalogPart>;
}

/// Rebrickable API v3 client
pub struct RebrickableClient {
    http_client: reqwest::Client,
    base_url: reqwest::Url,
    api_key: String,
}

impl RebrickableClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = reqwest::Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("invalid Rebrickable base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Rebrickable base URL {} cannot carry a path",
                base_url
            )));
        }

        Ok(Self {
            http_client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// `{base}/seg1/seg2/.../` with every segment percent-encoded
    ///
    /// A code such as `75192-1/?` stays one path segment instead of changing
    /// the request target.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Internal(format!("base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: reqwest::Url, what: &str) -> Result<T> {
        tracing::debug!(url = %url, "Querying Rebrickable API");

        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, format!("key {}", self.api_key))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("failed to fetch {} from Rebrickable: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "Rebrickable API returned status {} for {}: {}",
                status.as_u16(),
                what,
                body.trim()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Upstream(format!("failed to decode {} response: {}", what, e)))
    }
}

#[async_trait]
impl CatalogClient for RebrickableClient {
    async fn get_set(&self, set_num: &str) -> Result<CatalogSet> {
        let url = self.endpoint(&["lego", "sets", set_num])?;
        let set: CatalogSet = self.fetch(url, &format!("set {}", set_num)).await?;

        tracing::info!(set_num = %set.set_num, name = %set.name, "Retrieved set from Rebrickable");
        Ok(set)
    }

    async fn get_set_parts(&self, set_num: &str) -> Result<Vec<CatalogSetPart>> {
        let mut url = self.endpoint(&["lego", "sets", set_num, "parts"])?;
        url.set_query(Some("page=1&page_size=100000&inc_minifig_parts=1"));
        let page: SetPartsPage = self.fetch(url, &format!("parts of set {}", set_num)).await?;

        tracing::info!(set_num = %set_num, entries = page.results.len(), "Retrieved set parts from Rebrickable");
        Ok(page.results)
    }

    async fn get_part(&self, part_num: &str) -> Result<CatalogPart> {
        let url = self.endpoint(&["lego", "parts", part_num])?;
        self.fetch(url, &format!("part {}", part_num)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> RebrickableClient {
        RebrickableClient::new(base_url, "key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_ignores_trailing_slash_on_base() {
        for base in ["https://rebrickable.com/api/v3", "https://rebrickable.com/api/v3/"] {
            let url = client(base).endpoint(&["lego", "sets", "75192-1"]).unwrap();
            assert_eq!(url.as_str(), "https://rebrickable.com/api/v3/lego/sets/75192-1/");
        }
    }

    #[test]
    fn test_endpoint_escapes_code_as_one_segment() {
        let client = client("https://rebrickable.com/api/v3");

        let url = client.endpoint(&["lego", "sets", "75192-1/?x#y"]).unwrap();

        assert_eq!(
            url.as_str(),
            "https://rebrickable.com/api/v3/lego/sets/75192-1%2F%3Fx%23y/"
        );
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let result = RebrickableClient::new("not a url", "key", Duration::from_secs(5));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_set_part_decodes_with_nullable_fields() {
        let json = r#"{
            "id": 1071,
            "inv_part_id": 1071,
            "part": {
                "part_num": "3001",
                "name": "Brick 2 x 4",
                "part_cat_id": 11,
                "part_url": "https://rebrickable.com/parts/3001/",
                "part_img_url": null,
                "external_ids": {"BrickLink": ["3001"], "LEGO": ["3001"]},
                "print_of": null
            },
            "color": {"id": 4, "name": "Red", "rgb": "C91A09", "is_trans": false},
            "quantity": 6,
            "is_spare": false,
            "num_sets": 1520
        }"#;

        let entry: CatalogSetPart = serde_json::from_str(json).unwrap();
        assert_eq!(entry.part.part_num, "3001");
        assert!(entry.part.part_img_url.is_none());
        assert_eq!(entry.color.rgb, "C91A09");
        assert_eq!(entry.quantity, 6);
        assert_eq!(entry.part.external_ids["BrickLink"][0], "3001");
    }
}
