use chrono::Utc;
use ethers::{
    contract::{abigen, ContractCall},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, TransactionReceipt, U256, U64},
};
use log::{error, info};
use metrics::counter;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::error::{MarketError, MarketResult};
use crate::listings::{Listing, Price};
use crate::metrics::{METRIC_PURCHASES, METRIC_PURCHASE_FAILURES};
use crate::session::{PurchaseRecord, Session};
use crate::utils::format_ether_trimmed;

const CONTRACT_LABEL: &str = "NFT contract address";

abigen!(
    MarketplaceNft,
    r#"[
        function purchaseNFT(uint256 tokenId) external payable
    ]"#
);

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Submits purchases to the marketplace contract from the connected wallet.
pub struct Purchaser {
    provider: Arc<Provider<Http>>,
    signer: Option<Arc<SignerClient>>,
    contract: Option<Address>,
}

impl Purchaser {
    pub fn new(rpc_url: &str, contract: Option<Address>) -> MarketResult<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)?;
        Ok(Self {
            provider: Arc::new(provider),
            signer: None,
            contract,
        })
    }

    pub async fn from_config(config: &ServiceConfig) -> MarketResult<Self> {
        let mut purchaser = Self::new(&config.rpc_url, config.contract())?;
        if let Some(key) = &config.private_key {
            purchaser.connect_wallet(key).await?;
        }
        Ok(purchaser)
    }

    /// Looks up the chain id and attaches the wallet as signer.
    pub async fn connect_wallet(&mut self, private_key: &str) -> MarketResult<Address> {
        let wallet: LocalWallet = private_key
            .parse()
            .map_err(|e| MarketError::InvalidKey(format!("{}", e)))?;
        let chain_id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| MarketError::Rpc(e.to_string()))?;

        Ok(self.attach_wallet(wallet.with_chain_id(chain_id.as_u64())))
    }

    pub fn attach_wallet(&mut self, wallet: LocalWallet) -> Address {
        let address = wallet.address();
        let client = SignerMiddleware::new(self.provider.as_ref().clone(), wallet);
        self.signer = Some(Arc::new(client));
        info!("Signer ready for {:?}", address);
        address
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    pub async fn purchase_listing(
        &self,
        session: &mut Session,
        listing: &Listing,
    ) -> MarketResult<PurchaseRecord> {
        self.purchase(session, &listing.token_id, &listing.price).await
    }

    /// Pays `price` to the contract for `token_id` and waits for the receipt.
    /// Confirmed purchases are appended to the session history. Not retried.
    pub async fn purchase(
        &self,
        session: &mut Session,
        token_id: &str,
        price: &Price,
    ) -> MarketResult<PurchaseRecord> {
        let signer = self.signer.as_ref().ok_or(MarketError::WalletNotConnected)?;
        let contract_address = self
            .contract
            .ok_or(MarketError::MissingCredential(CONTRACT_LABEL))?;
        let value = price
            .wei()
            .ok_or_else(|| MarketError::NotForSale(token_id.to_string()))?;
        let token = U256::from_dec_str(token_id)
            .map_err(|_| MarketError::InvalidTokenId(token_id.to_string()))?;

        info!("Purchasing token {} for {}", token_id, price);
        let contract = MarketplaceNft::new(contract_address, signer.clone());
        let receipt = match submit(contract.purchase_nft(token).value(value)).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!("Error purchasing NFT {}: {}", token_id, e);
                counter!(METRIC_PURCHASE_FAILURES, 1);
                return Err(e);
            }
        };

        let record = PurchaseRecord {
            token_id: token_id.to_string(),
            price: price.clone(),
            tx_hash: Some(format!("{:?}", receipt.transaction_hash)),
            purchased_at: Utc::now(),
        };
        session.record_purchase(record.clone());
        counter!(METRIC_PURCHASES, 1);
        info!("NFT {} purchased in {:?}", token_id, receipt.transaction_hash);

        Ok(record)
    }

    /// Native balance of `address`, in ether.
    pub async fn wallet_balance(&self, address: &str) -> MarketResult<String> {
        let parsed: Address = address
            .parse()
            .map_err(|_| MarketError::InvalidAddress(address.to_string()))?;
        let wei = self
            .provider
            .get_balance(parsed, None)
            .await
            .map_err(|e| MarketError::Rpc(e.to_string()))?;
        Ok(format_ether_trimmed(wei))
    }
}

async fn submit(call: ContractCall<SignerClient, ()>) -> MarketResult<TransactionReceipt> {
    let pending = call
        .send()
        .await
        .map_err(|e| MarketError::Transaction(e.to_string()))?;
    let receipt = pending
        .await
        .map_err(|e| MarketError::Transaction(e.to_string()))?
        .ok_or_else(|| MarketError::Transaction("transaction dropped".to_string()))?;

    if receipt.status == Some(U64::zero()) {
        return Err(MarketError::Transaction(format!(
            "transaction {:?} reverted",
            receipt.transaction_hash
        )));
    }
    Ok(receipt)
}
