use thiserror::Error;

pub type MarketResult<T> = Result<T, MarketError>;

#[derive(Debug, Error)]
pub enum MarketError {
    /// A secret required by one remote call is not configured.
    #[error("{0} is missing")]
    MissingCredential(&'static str),

    #[error("{service} responded with status {status}: {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{0} request timed out")]
    Timeout(&'static str),

    #[error("network error talking to {service}: {source}")]
    Network {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response from {service}: {message}")]
    Malformed {
        service: &'static str,
        message: String,
    },

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("an ad is already being watched ({remaining}s left)")]
    AlreadyWatching { remaining: u32 },

    #[error("token {0} is not for sale")]
    NotForSale(String),

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("invalid token id: {0}")]
    InvalidTokenId(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid wallet key: {0}")]
    InvalidKey(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("session file error: {0}")]
    Session(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl MarketError {
    /// Sorts a transport error into timeout, upstream status or plain network failure.
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MarketError::Timeout(service)
        } else if let Some(status) = err.status() {
            MarketError::Upstream {
                service,
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            MarketError::Network {
                service,
                source: err,
            }
        }
    }

    pub fn is_missing_credential(&self) -> bool {
        matches!(self, MarketError::MissingCredential(_))
    }
}
