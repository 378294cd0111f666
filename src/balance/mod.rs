use log::{debug, info, warn};
use metrics::counter;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::config::ServiceConfig;
use crate::constants::{
    DEFAULT_CLICKS, DEFAULT_EARNINGS, DEFAULT_IMPRESSIONS, DEFAULT_TOKENS, DEFAULT_TOKEN_HISTORY,
};
use crate::error::{MarketError, MarketResult};
use crate::metrics::METRIC_BALANCE_PERSIST_FAILURES;

const SERVICE: &str = "balance api";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdPerformance {
    pub impressions: u64,
    pub clicks: u64,
    pub earnings: f64,
}

impl Default for AdPerformance {
    fn default() -> Self {
        Self {
            impressions: DEFAULT_IMPRESSIONS,
            clicks: DEFAULT_CLICKS,
            earnings: DEFAULT_EARNINGS,
        }
    }
}

/// Token balance of one wallet plus the ad counters and the rolling history
/// window shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBalance {
    pub tokens: u64,
    pub ad_performance: AdPerformance,
    pub token_history: Vec<f64>,
}

impl UserBalance {
    pub fn default_for_new_user() -> Self {
        Self {
            tokens: DEFAULT_TOKENS,
            ad_performance: AdPerformance::default(),
            token_history: DEFAULT_TOKEN_HISTORY.to_vec(),
        }
    }

    /// Builds a balance from whatever the remote record carries. Absent or
    /// mistyped fields fall back one by one instead of rejecting the record.
    pub fn from_record(record: &Value) -> Self {
        let tokens = record.get("tokens").and_then(Value::as_u64).unwrap_or(0);

        let ad_performance = record
            .get("adPerformance")
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value::<AdPerformance>(v.clone()).ok())
            .unwrap_or_default();

        let token_history = record
            .get("tokenHistory")
            .and_then(Value::as_array)
            .map(|samples| samples.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_else(|| DEFAULT_TOKEN_HISTORY.to_vec());

        Self {
            tokens,
            ad_performance,
            token_history,
        }
    }

    /// Slides the history window one step: the newest sample is the previous
    /// newest plus one and the oldest sample falls off. Width never changes.
    pub fn advance_history(&mut self) {
        let next = self.token_history.last().copied().unwrap_or(0.0) + 1.0;
        if !self.token_history.is_empty() {
            self.token_history.remove(0);
        }
        self.token_history.push(next);
    }
}

impl Default for UserBalance {
    fn default() -> Self {
        Self::default_for_new_user()
    }
}

/// Client side of the `/api/tokens` endpoint.
///
/// Nothing here surfaces an error to the caller: a failed fetch yields the
/// new-user default and a failed persist only gets logged. Concurrent
/// persists for one address are last-write-wins on the server.
#[derive(Debug, Clone)]
pub struct BalanceSynchronizer {
    client: Client,
    endpoint: Url,
}

impl BalanceSynchronizer {
    pub fn new(base_url: &str) -> MarketResult<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn from_config(config: &ServiceConfig) -> MarketResult<Self> {
        Self::new(&config.balance_api_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> MarketResult<Self> {
        let endpoint = Url::parse(base_url)?.join("/api/tokens")?;
        Ok(Self { client, endpoint })
    }

    pub async fn fetch(&self, address: &str) -> UserBalance {
        match self.try_fetch(address).await {
            Ok(Some(balance)) => {
                debug!("Loaded balance for {}: {} tokens", address, balance.tokens);
                balance
            }
            Ok(None) => {
                info!("No stored balance for {}, starting from defaults", address);
                UserBalance::default_for_new_user()
            }
            Err(e) => {
                warn!("Error fetching user tokens for {}: {}", address, e);
                UserBalance::default_for_new_user()
            }
        }
    }

    /// Returns whether the remote write landed.
    pub async fn persist(&self, address: &str, balance: &UserBalance) -> bool {
        match self.try_persist(address, balance).await {
            Ok(()) => {
                debug!("Saved balance for {}", address);
                true
            }
            Err(e) => {
                warn!("Error saving tokens for {}: {}", address, e);
                counter!(METRIC_BALANCE_PERSIST_FAILURES, 1);
                false
            }
        }
    }

    async fn try_fetch(&self, address: &str) -> MarketResult<Option<UserBalance>> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("address", address)])
            .send()
            .await
            .map_err(|e| MarketError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(MarketError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let record: Value = response
            .json()
            .await
            .map_err(|e| MarketError::Malformed {
                service: SERVICE,
                message: e.to_string(),
            })?;

        Ok(Some(UserBalance::from_record(&record)))
    }

    async fn try_persist(&self, address: &str, balance: &UserBalance) -> MarketResult<()> {
        let body = json!({ "address": address, "tokenData": balance });
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| MarketError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}
