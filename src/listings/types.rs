use ethers::types::U256;
use ethers::utils::parse_ether;
use log::warn;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_CURRENCY, NOT_FOR_SALE, NO_DESCRIPTION, UNKNOWN, UNKNOWN_COLLECTION, UNNAMED_COLLECTION,
    UNNAMED_NFT,
};
use crate::error::{MarketError, MarketResult};
use crate::utils::format_ether_trimmed;

/// Asking price of a listing. On the wire this is the display string,
/// e.g. `"1 ETH"` or `"Not for sale"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Price {
    Priced { wei: U256, currency: String },
    NotForSale,
}

impl Price {
    /// Reads a smallest-unit integer amount. Zero and unreadable amounts are not for sale.
    pub fn from_wei_str(raw: &str, currency: Option<&str>) -> Self {
        let raw = raw.trim();
        // Some records carry "1000000000000000000.0"
        let integral = match raw.split_once('.') {
            Some((whole, frac)) if frac.chars().all(|c| c == '0') => whole,
            _ => raw,
        };

        match U256::from_dec_str(integral) {
            Ok(wei) if !wei.is_zero() => Price::Priced {
                wei,
                currency: currency_or_default(currency),
            },
            Ok(_) => Price::NotForSale,
            Err(_) => {
                warn!("Unreadable price amount {:?}", raw);
                Price::NotForSale
            }
        }
    }

    /// Converts a decimal display amount ("0.25") into wei.
    pub fn from_decimal(amount: &str, currency: &str) -> MarketResult<Self> {
        let wei = parse_ether(amount.trim())
            .map_err(|e| MarketError::InvalidPrice(format!("{}: {}", amount, e)))?;
        if wei.is_zero() {
            return Ok(Price::NotForSale);
        }
        Ok(Price::Priced {
            wei,
            currency: currency_or_default(Some(currency)),
        })
    }

    pub fn wei(&self) -> Option<U256> {
        match self {
            Price::Priced { wei, .. } => Some(*wei),
            Price::NotForSale => None,
        }
    }

    pub fn is_for_sale(&self) -> bool {
        matches!(self, Price::Priced { .. })
    }
}

fn currency_or_default(currency: Option<&str>) -> String {
    currency
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CURRENCY)
        .to_string()
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Priced { wei, currency } => {
                write!(f, "{} {}", format_ether_trimmed(*wei), currency)
            }
            Price::NotForSale => f.write_str(NOT_FOR_SALE),
        }
    }
}

impl FromStr for Price {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(NOT_FOR_SALE) {
            return Ok(Price::NotForSale);
        }

        let mut parts = s.split_whitespace();
        let amount = parts
            .next()
            .ok_or_else(|| MarketError::InvalidPrice(s.to_string()))?;
        let currency = parts.next().unwrap_or(DEFAULT_CURRENCY);
        if parts.next().is_some() {
            return Err(MarketError::InvalidPrice(s.to_string()));
        }
        Price::from_decimal(amount, currency)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub token_id: String,
    pub name: String,
    pub description: String,
    pub image: String,
    pub price: Price,
    pub collection_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub address: String,
    pub name: String,
    pub description: String,
    pub image: String,
    pub floor_price: String,
    pub total_volume: String,
}

/// Non-empty text at a JSON pointer. Numbers are rendered as text.
fn text_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_or(value: &Value, pointer: &str, fallback: &str) -> String {
    text_at(value, pointer).unwrap_or_else(|| fallback.to_string())
}

/// Collection stats treat zero like a missing value.
fn stat_or_unknown(value: &Value, pointer: &str) -> String {
    match value.pointer(pointer) {
        Some(Value::Number(n)) if n.as_f64().map_or(false, |f| f != 0.0) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => UNKNOWN.to_string(),
    }
}

/// Maps one Seaport order from the v2 listings endpoint.
pub fn normalize_order(order: &Value) -> Listing {
    let asset = order
        .pointer("/maker_asset_bundle/assets/0")
        .unwrap_or(&Value::Null);

    let symbol = text_at(order, "/taker_asset_bundle/asset_contract/symbol")
        .or_else(|| text_at(order, "/taker_asset_bundle/assets/0/asset_contract/symbol"));
    let price = match text_at(order, "/current_price") {
        Some(raw) => Price::from_wei_str(&raw, symbol.as_deref()),
        None => Price::NotForSale,
    };

    Listing {
        token_id: text_or(
            order,
            "/protocol_data/parameters/offer/0/identifierOrCriteria",
            UNKNOWN,
        ),
        name: text_or(asset, "/name", UNNAMED_NFT),
        description: text_or(asset, "/description", NO_DESCRIPTION),
        image: text_or(asset, "/image_url", ""),
        price,
        collection_name: text_or(asset, "/collection/name", UNKNOWN_COLLECTION),
    }
}

/// Maps one record from the legacy v1 assets endpoint, priced by its last sale.
pub fn normalize_asset(asset: &Value) -> Listing {
    let price = match asset.get("last_sale") {
        Some(sale) if !sale.is_null() => match text_at(sale, "/total_price") {
            Some(raw) => {
                let symbol = text_at(sale, "/payment_token/symbol");
                Price::from_wei_str(&raw, symbol.as_deref())
            }
            None => Price::NotForSale,
        },
        _ => Price::NotForSale,
    };

    Listing {
        token_id: text_or(asset, "/token_id", UNKNOWN),
        name: text_or(asset, "/name", UNNAMED_NFT),
        description: text_or(asset, "/description", NO_DESCRIPTION),
        image: text_or(asset, "/image_url", ""),
        price,
        collection_name: text_or(asset, "/collection/name", UNKNOWN_COLLECTION),
    }
}

pub fn normalize_collection(collection: &Value) -> Collection {
    Collection {
        address: text_or(collection, "/primary_asset_contracts/0/address", UNKNOWN),
        name: text_or(collection, "/name", UNNAMED_COLLECTION),
        description: text_or(collection, "/description", NO_DESCRIPTION),
        image: text_or(collection, "/image_url", ""),
        floor_price: stat_or_unknown(collection, "/stats/floor_price"),
        total_volume: stat_or_unknown(collection, "/stats/total_volume"),
    }
}
