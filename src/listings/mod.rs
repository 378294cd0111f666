pub mod types;

pub use types::{normalize_asset, normalize_collection, normalize_order, Collection, Listing, Price};

use log::{debug, error, info};
use metrics::{counter, histogram};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use url::Url;

use crate::config::{RuntimeConfig, ServiceConfig};
use crate::error::{MarketError, MarketResult};
use crate::metrics::{METRIC_LISTING_FETCHES, METRIC_LISTING_FETCH_FAILURES, METRIC_LISTING_FETCH_TIME};

const SERVICE: &str = "OpenSea";
const API_KEY_LABEL: &str = "OpenSea API key";

const LISTINGS_PATH: &str = "/api/v2/orders/ethereum/seaport/listings";
const ASSETS_PATH: &str = "/api/v1/assets";
const COLLECTIONS_PATH: &str = "/api/v1/collections";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingsResponse {
    pub nfts: Vec<Listing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ListingsResponse {
    pub fn ok(nfts: Vec<Listing>) -> Self {
        Self {
            nfts,
            ..Default::default()
        }
    }

    pub fn failed(err: &MarketError) -> Self {
        let (error, details) = describe_failure(err, "Error fetching NFTs");
        Self {
            nfts: Vec::new(),
            error: Some(error),
            details,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionsResponse {
    pub collections: Vec<Collection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CollectionsResponse {
    pub fn ok(collections: Vec<Collection>) -> Self {
        Self {
            collections,
            ..Default::default()
        }
    }

    pub fn failed(err: &MarketError) -> Self {
        let (error, details) = describe_failure(err, "Error fetching collections");
        Self {
            collections: Vec::new(),
            error: Some(error),
            details,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// A missing key is reported as-is; anything else gets a summary plus the cause.
fn describe_failure(err: &MarketError, summary: &str) -> (String, Option<String>) {
    if err.is_missing_credential() {
        (err.to_string(), None)
    } else {
        (summary.to_string(), Some(err.to_string()))
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 10 {
        return "***".to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{}...{}", head, tail)
}

fn items<'a>(body: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    body.get(key).and_then(Value::as_array).into_iter().flatten()
}

/// Read-only client for the marketplace listing source.
#[derive(Debug, Clone)]
pub struct OpenSeaClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    page_size: u32,
}

impl OpenSeaClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        page_size: u32,
        timeout: Duration,
    ) -> MarketResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketError::from_reqwest(SERVICE, e))?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            api_key,
            page_size,
        })
    }

    pub fn from_config(config: &ServiceConfig, runtime: &RuntimeConfig) -> MarketResult<Self> {
        Self::new(
            &config.opensea_url,
            config.opensea_api_key.clone(),
            config.listing_page_size,
            runtime.listing_timeout,
        )
    }

    /// Newest active listings. Never fails: errors come back inside the response.
    pub async fn fetch_listings(&self) -> ListingsResponse {
        let start = Instant::now();
        counter!(METRIC_LISTING_FETCHES, 1);
        let result = self.try_fetch_listings().await;
        histogram!(METRIC_LISTING_FETCH_TIME, start.elapsed().as_secs_f64());

        match result {
            Ok(nfts) => {
                info!("Fetched {} listings from OpenSea", nfts.len());
                ListingsResponse::ok(nfts)
            }
            Err(e) => {
                error!("Error fetching NFTs from OpenSea: {}", e);
                counter!(METRIC_LISTING_FETCH_FAILURES, 1);
                ListingsResponse::failed(&e)
            }
        }
    }

    /// Legacy asset feed, priced by last sale.
    pub async fn fetch_assets(&self) -> ListingsResponse {
        let query = [
            ("order_direction", "desc".to_string()),
            ("offset", "0".to_string()),
            ("limit", self.page_size.to_string()),
        ];

        match self.get_json(ASSETS_PATH, &query).await {
            Ok(body) => ListingsResponse::ok(items(&body, "assets").map(normalize_asset).collect()),
            Err(e) => {
                error!("Error fetching assets from OpenSea: {}", e);
                counter!(METRIC_LISTING_FETCH_FAILURES, 1);
                ListingsResponse::failed(&e)
            }
        }
    }

    pub async fn fetch_collections(&self) -> CollectionsResponse {
        let query = [
            ("offset", "0".to_string()),
            ("limit", self.page_size.to_string()),
        ];

        match self.get_json(COLLECTIONS_PATH, &query).await {
            Ok(body) => {
                let collections: Vec<Collection> =
                    items(&body, "collections").map(normalize_collection).collect();
                if collections.is_empty() {
                    info!("No collections returned from OpenSea");
                }
                CollectionsResponse::ok(collections)
            }
            Err(e) => {
                error!("Error fetching collections from OpenSea: {}", e);
                CollectionsResponse::failed(&e)
            }
        }
    }

    pub async fn try_fetch_listings(&self) -> MarketResult<Vec<Listing>> {
        let query = [
            ("order_by", "created_date".to_string()),
            ("order_direction", "desc".to_string()),
            ("limit", self.page_size.to_string()),
        ];

        let body = self.get_json(LISTINGS_PATH, &query).await?;
        let nfts: Vec<Listing> = items(&body, "orders").map(normalize_order).collect();
        if nfts.is_empty() {
            info!("No orders returned from OpenSea");
        }
        Ok(nfts)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> MarketResult<Value> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(MarketError::MissingCredential(API_KEY_LABEL))?;
        debug!("Querying {} with API key {}", path, mask_key(api_key));

        let url = self.base_url.join(path)?;
        let response = self
            .client
            .get(url)
            .query(query)
            .header("X-API-KEY", api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| MarketError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MarketError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                MarketError::Timeout(SERVICE)
            } else {
                MarketError::Malformed {
                    service: SERVICE,
                    message: e.to_string(),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("short"), "***");
        assert_eq!(mask_key("abcdefghijklmnop"), "abcde...lmnop");
        assert_eq!(mask_key("ключ-доступа-opensea"), "ключ-...ensea");
        assert_eq!(mask_key("ééééééééééé"), "ééééé...ééééé");
    }

    #[test]
    fn test_failure_shapes() {
        let missing = ListingsResponse::failed(&MarketError::MissingCredential(API_KEY_LABEL));
        assert_eq!(missing.error.as_deref(), Some("OpenSea API key is missing"));
        assert!(missing.details.is_none());
        assert!(missing.nfts.is_empty());

        let upstream = ListingsResponse::failed(&MarketError::Upstream {
            service: SERVICE,
            status: 500,
            message: "boom".to_string(),
        });
        assert_eq!(upstream.error.as_deref(), Some("Error fetching NFTs"));
        assert!(upstream.details.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_missing_key_never_hits_network() {
        // Port 9 is discard; a request there would fail differently.
        let client =
            OpenSeaClient::new("http://127.0.0.1:9", None, 20, Duration::from_secs(1)).unwrap();
        let response = client.fetch_listings().await;
        assert!(response.is_error());
        assert_eq!(response.error.as_deref(), Some("OpenSea API key is missing"));
    }
}
