use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{MarketError, MarketResult};
use crate::listings::Price;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub token_id: String,
    pub price: Price,
    pub tx_hash: Option<String>,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthPoint {
    pub name: String,
    #[serde(rename = "NFTs")]
    pub nfts: usize,
}

/// Per-user state that outlives a single view: the connected wallet and
/// what it bought. Loaded once at session start, saved at session end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    connected_address: Option<String>,
    #[serde(default)]
    purchased_nfts: Vec<PurchaseRecord>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A missing file is an empty session, not an error.
    pub fn load(path: impl AsRef<Path>) -> MarketResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No session file at {}, starting fresh", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)?;
        let session: Session = serde_json::from_str(&raw)?;
        info!(
            "Loaded session for {:?} with {} purchases",
            session.connected_address,
            session.purchased_nfts.len()
        );
        Ok(session)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> MarketResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn connect(&mut self, address: impl Into<String>) {
        let address = address.into();
        info!("Wallet connected: {}", address);
        self.connected_address = Some(address);
    }

    pub fn disconnect(&mut self) {
        self.connected_address = None;
    }

    pub fn connected_address(&self) -> Option<&str> {
        self.connected_address.as_deref()
    }

    pub fn require_address(&self) -> MarketResult<&str> {
        self.connected_address().ok_or(MarketError::WalletNotConnected)
    }

    pub fn record_purchase(&mut self, record: PurchaseRecord) {
        self.purchased_nfts.push(record);
    }

    pub fn purchases(&self) -> &[PurchaseRecord] {
        &self.purchased_nfts
    }

    /// Cumulative purchase count, one point per purchase.
    pub fn growth_series(&self) -> Vec<GrowthPoint> {
        (1..=self.purchased_nfts.len())
            .map(|n| GrowthPoint {
                name: format!("Day {}", n),
                nfts: n,
            })
            .collect()
    }
}
