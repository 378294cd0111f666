use anyhow::{anyhow, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::constants::{Env, AD_WATCH_SECONDS, LISTING_PAGE_SIZE, LISTING_TIMEOUT};
use crate::utils::non_empty;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServiceConfig {
    // Marketplace source
    #[validate(custom = "validate_http_url")]
    pub opensea_url: String,
    pub opensea_api_key: Option<String>,
    #[validate(range(min = 1, max = 200))]
    pub listing_page_size: u32,

    // IPFS pinning
    #[validate(custom = "validate_http_url")]
    pub pinata_url: String,
    pub pinata_api_key: Option<String>,
    pub pinata_secret_api_key: Option<String>,

    // Chain access
    #[validate(custom = "validate_http_url")]
    pub rpc_url: String,
    #[validate(custom = "validate_private_key")]
    pub private_key: Option<String>,
    #[validate(custom = "validate_contract_address")]
    pub contract_address: Option<String>,

    // Service wiring
    pub bind_addr: String,
    #[validate(custom = "validate_http_url")]
    pub balance_api_url: String,
    pub session_path: String,
}

impl ServiceConfig {
    /// Secrets are optional here; each remote call reports its own missing credential.
    pub fn from_env(env: &Env) -> Self {
        Self {
            opensea_url: env.opensea_url.clone(),
            opensea_api_key: non_empty(&env.opensea_api_key),
            listing_page_size: LISTING_PAGE_SIZE,
            pinata_url: env.pinata_url.clone(),
            pinata_api_key: non_empty(&env.pinata_api_key),
            pinata_secret_api_key: non_empty(&env.pinata_secret_api_key),
            rpc_url: env.https_url.clone(),
            private_key: non_empty(&env.private_key),
            contract_address: non_empty(&env.contract_address),
            bind_addr: env.bind_addr.clone(),
            balance_api_url: env.balance_api_url.clone(),
            session_path: env.session_path.clone(),
        }
    }

    pub fn validate_all(&self) -> Result<()> {
        if let Err(e) = self.validate() {
            return Err(anyhow!("Configuration validation failed: {:?}", e));
        }

        self.validate_bind_addr()?;
        self.validate_pinata_pair()?;

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|e| anyhow!("Invalid bind address {}: {}", self.bind_addr, e))
    }

    /// The configured contract address, if any. Validation has already rejected bad values.
    pub fn contract(&self) -> Option<Address> {
        self.contract_address
            .as_deref()
            .and_then(|s| s.parse::<Address>().ok())
    }

    fn validate_bind_addr(&self) -> Result<()> {
        self.socket_addr().map(|_| ())
    }

    fn validate_pinata_pair(&self) -> Result<()> {
        match (&self.pinata_api_key, &self.pinata_secret_api_key) {
            (Some(_), None) | (None, Some(_)) => Err(anyhow!(
                "PINATA_API_KEY and PINATA_SECRET_API_KEY must be set together"
            )),
            _ => Ok(()),
        }
    }
}

// Custom validators
fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ValidationError::new("invalid_http_url"));
    }
    url::Url::parse(url).map_err(|_| ValidationError::new("invalid_http_url"))?;
    Ok(())
}

fn validate_private_key(key: &str) -> Result<(), ValidationError> {
    let hex = key.strip_prefix("0x").unwrap_or(key);
    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::new("invalid_private_key"));
    }
    Ok(())
}

fn validate_contract_address(address: &str) -> Result<(), ValidationError> {
    let parsed = address
        .parse::<Address>()
        .map_err(|_| ValidationError::new("invalid_address"))?;
    if parsed == Address::zero() {
        return Err(ValidationError::new("zero_address"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub listing_timeout: Duration,
    pub ad_watch_seconds: u32,
    pub tick_interval: Duration,
    pub metrics_port: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            listing_timeout: LISTING_TIMEOUT,
            ad_watch_seconds: AD_WATCH_SECONDS,
            tick_interval: Duration::from_secs(1),
            metrics_port: 9090,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ServiceConfig {
        ServiceConfig {
            opensea_url: "https://api.opensea.io".to_string(),
            opensea_api_key: None,
            listing_page_size: 20,
            pinata_url: "https://api.pinata.cloud".to_string(),
            pinata_api_key: None,
            pinata_secret_api_key: None,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            private_key: None,
            contract_address: None,
            bind_addr: "127.0.0.1:3000".to_string(),
            balance_api_url: "http://127.0.0.1:3000".to_string(),
            session_path: ".session.json".to_string(),
        }
    }

    #[test]
    fn test_config_without_secrets_is_valid() {
        assert!(base_config().validate_all().is_ok());
    }

    #[test]
    fn test_rejects_bad_urls() {
        let mut config = base_config();
        config.opensea_url = "ftp://example.com".to_string();
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn test_rejects_zero_contract() {
        let mut config = base_config();
        config.contract_address = Some(format!("{:?}", Address::zero()));
        assert!(config.validate_all().is_err());

        config.contract_address = Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string());
        assert!(config.validate_all().is_ok());
        assert!(config.contract().is_some());
    }

    #[test]
    fn test_private_key_format() {
        let mut config = base_config();
        config.private_key = Some("0x1234".to_string());
        assert!(config.validate_all().is_err());

        config.private_key = Some(format!("0x{}", "ab".repeat(32)));
        assert!(config.validate_all().is_ok());
    }

    #[test]
    fn test_pinata_keys_come_in_pairs() {
        let mut config = base_config();
        config.pinata_api_key = Some("key".to_string());
        assert!(config.validate_all().is_err());

        config.pinata_secret_api_key = Some("secret".to_string());
        assert!(config.validate_all().is_ok());
    }

    #[test]
    fn test_bad_bind_addr() {
        let mut config = base_config();
        config.bind_addr = "localhost".to_string();
        assert!(config.validate_all().is_err());
    }
}
