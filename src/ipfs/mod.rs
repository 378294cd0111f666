use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ServiceConfig;
use crate::error::{MarketError, MarketResult};

const SERVICE: &str = "Pinata";
const CREDENTIAL_LABEL: &str = "Pinata API key pair";
const PIN_JSON_PATH: &str = "/pinning/pinJSONToIPFS";

#[derive(Debug, Clone)]
struct PinataKeys {
    api_key: String,
    secret_api_key: String,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Pins JSON documents to IPFS through Pinata.
#[derive(Debug, Clone)]
pub struct PinataClient {
    client: Client,
    base_url: Url,
    keys: Option<PinataKeys>,
}

impl PinataClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        secret_api_key: Option<String>,
    ) -> MarketResult<Self> {
        let keys = match (api_key, secret_api_key) {
            (Some(api_key), Some(secret_api_key)) => Some(PinataKeys {
                api_key,
                secret_api_key,
            }),
            _ => None,
        };

        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(base_url)?,
            keys,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> MarketResult<Self> {
        Self::new(
            &config.pinata_url,
            config.pinata_api_key.clone(),
            config.pinata_secret_api_key.clone(),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.keys.is_some()
    }

    /// Returns the IPFS content hash of the pinned document.
    pub async fn pin_json<T: Serialize + ?Sized>(&self, body: &T) -> MarketResult<String> {
        let keys = self
            .keys
            .as_ref()
            .ok_or(MarketError::MissingCredential(CREDENTIAL_LABEL))?;

        let url = self.base_url.join(PIN_JSON_PATH)?;
        let response = self
            .client
            .post(url)
            .header("pinata_api_key", &keys.api_key)
            .header("pinata_secret_api_key", &keys.secret_api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| MarketError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Error pinning to IPFS: {} {}", status, message);
            return Err(MarketError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        let pinned: PinResponse = response.json().await.map_err(|e| MarketError::Malformed {
            service: SERVICE,
            message: e.to_string(),
        })?;
        debug!("Pinned document as {}", pinned.ipfs_hash);
        Ok(pinned.ipfs_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_keys() {
        let client = PinataClient::new("http://127.0.0.1:9", Some("key".into()), None).unwrap();
        assert!(!client.is_configured());

        let err = client.pin_json(&json!({ "tokens": 1 })).await.unwrap_err();
        assert!(err.is_missing_credential());
        assert_eq!(err.to_string(), "Pinata API key pair is missing");
    }
}
