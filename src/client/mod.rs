use ethers::types::Address;
use log::info;
use std::path::PathBuf;

use crate::balance::BalanceSynchronizer;
use crate::config::{RuntimeConfig, ServiceConfig};
use crate::error::MarketResult;
use crate::listings::Listing;
use crate::purchase::Purchaser;
use crate::reward::RewardsDashboard;
use crate::session::{PurchaseRecord, Session};

/// Wallet-side entry point built from `ServiceConfig`: the session file,
/// the balance backend and the purchase signer.
///
/// Every change to the session is written back to `session_path` right away.
pub struct MarketClient {
    session: Session,
    session_path: PathBuf,
    synchronizer: BalanceSynchronizer,
    purchaser: Purchaser,
    runtime: RuntimeConfig,
}

impl MarketClient {
    /// Connects the configured wallet, if any, which needs the RPC endpoint to answer.
    pub async fn from_config(config: &ServiceConfig, runtime: RuntimeConfig) -> MarketResult<Self> {
        let session_path = PathBuf::from(&config.session_path);
        let session = Session::load(&session_path)?;

        Ok(Self {
            session,
            session_path,
            synchronizer: BalanceSynchronizer::from_config(config)?,
            purchaser: Purchaser::from_config(config).await?,
            runtime,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn wallet_address(&self) -> Option<Address> {
        self.purchaser.signer_address()
    }

    pub fn connect(&mut self, address: impl Into<String>) -> MarketResult<()> {
        self.session.connect(address);
        self.session.save(&self.session_path)
    }

    pub fn disconnect(&mut self) -> MarketResult<()> {
        self.session.disconnect();
        self.session.save(&self.session_path)
    }

    pub async fn dashboard(&self) -> MarketResult<RewardsDashboard> {
        RewardsDashboard::load(&self.session, self.synchronizer.clone(), &self.runtime).await
    }

    pub async fn buy(&mut self, listing: &Listing) -> MarketResult<PurchaseRecord> {
        let record = self
            .purchaser
            .purchase_listing(&mut self.session, listing)
            .await?;
        self.session.save(&self.session_path)?;
        info!(
            "Session now holds {} purchases",
            self.session.purchases().len()
        );
        Ok(record)
    }
}
