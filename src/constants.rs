use std::time::Duration;

pub static PROJECT_NAME: &str = "ad_rewards";

pub const OPENSEA_API_URL: &str = "https://api.opensea.io";
pub const PINATA_API_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_BALANCE_API_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_SESSION_PATH: &str = ".session.json";

/// Seconds a user has to watch an ad before the reward is granted.
pub const AD_WATCH_SECONDS: u32 = 10;
pub const EARNINGS_PER_AD: f64 = 0.5;

/// Page size used for both the listings and the collections endpoints.
pub const LISTING_PAGE_SIZE: u32 = 20;
pub const LISTING_TIMEOUT: Duration = Duration::from_secs(10);

pub const ETHER_DECIMALS: usize = 18;
pub const DEFAULT_CURRENCY: &str = "ETH";

// Placeholders substituted for missing upstream fields
pub const UNKNOWN: &str = "Unknown";
pub const UNNAMED_NFT: &str = "Unnamed NFT";
pub const UNNAMED_COLLECTION: &str = "Unnamed Collection";
pub const UNKNOWN_COLLECTION: &str = "Unknown Collection";
pub const NO_DESCRIPTION: &str = "No description available";
pub const NOT_FOR_SALE: &str = "Not for sale";

// Dashboard state shown before (or instead of) a stored balance
pub const DEFAULT_TOKENS: u64 = 1;
pub const DEFAULT_IMPRESSIONS: u64 = 1000;
pub const DEFAULT_CLICKS: u64 = 50;
pub const DEFAULT_EARNINGS: f64 = 500.0;
pub const DEFAULT_TOKEN_HISTORY: [f64; 6] = [65.0, 59.0, 80.0, 81.0, 56.0, 55.0];

pub fn get_env(key: &str) -> String {
    std::env::var(key).unwrap_or(String::from(""))
}

fn get_env_or(key: &str, fallback: &str) -> String {
    let value = get_env(key);
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

#[derive(Debug, Clone)]
pub struct Env {
    pub https_url: String,
    pub private_key: String,
    pub contract_address: String,
    pub opensea_api_key: String,
    pub opensea_url: String,
    pub pinata_api_key: String,
    pub pinata_secret_api_key: String,
    pub pinata_url: String,
    pub bind_addr: String,
    pub balance_api_url: String,
    pub session_path: String,
    pub log_level: String,
}

impl Env {
    pub fn new() -> Self {
        Env {
            https_url: get_env_or("HTTPS_URL", DEFAULT_RPC_URL),
            private_key: get_env("PRIVATE_KEY"),
            contract_address: get_env("NFT_CONTRACT_ADDRESS"),
            opensea_api_key: get_env("OPENSEA_API_KEY"),
            opensea_url: get_env_or("OPENSEA_API_URL", OPENSEA_API_URL),
            pinata_api_key: get_env("PINATA_API_KEY"),
            pinata_secret_api_key: get_env("PINATA_SECRET_API_KEY"),
            pinata_url: get_env_or("PINATA_API_URL", PINATA_API_URL),
            bind_addr: get_env_or("BIND_ADDR", DEFAULT_BIND_ADDR),
            balance_api_url: get_env_or("BALANCE_API_URL", DEFAULT_BALANCE_API_URL),
            session_path: get_env_or("SESSION_PATH", DEFAULT_SESSION_PATH),
            log_level: get_env_or("LOG_LEVEL", "info"),
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
