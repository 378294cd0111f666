use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};

use crate::balance::AdPerformance;
use crate::error::MarketResult;

/// Balance fields as posted by the dashboard. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    #[serde(default)]
    pub tokens: Option<u64>,
    #[serde(default)]
    pub ad_performance: Option<AdPerformance>,
    #[serde(default)]
    pub token_history: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub address: String,
    #[serde(flatten)]
    pub data: TokenData,
    pub ipfs_hash: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Modified,
    Unchanged,
}

/// The `users` collection.
///
/// Upserts are last-write-wins with no version check: two sessions saving
/// the same address concurrently can lose one of the updates.
#[cfg_attr(test, mockall::automock)]
pub trait UserStore: Send + Sync {
    fn find(&self, address: &str) -> MarketResult<Option<UserRecord>>;

    fn upsert(
        &self,
        address: &str,
        data: TokenData,
        ipfs_hash: String,
    ) -> MarketResult<UpsertOutcome>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<String, UserRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserStore for MemoryStore {
    fn find(&self, address: &str) -> MarketResult<Option<UserRecord>> {
        Ok(self.users.get(address).map(|entry| entry.value().clone()))
    }

    fn upsert(
        &self,
        address: &str,
        data: TokenData,
        ipfs_hash: String,
    ) -> MarketResult<UpsertOutcome> {
        let now = Utc::now();
        match self.users.entry(address.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(UserRecord {
                    address: address.to_string(),
                    data,
                    ipfs_hash: Some(ipfs_hash),
                    updated_at: now,
                });
                Ok(UpsertOutcome::Inserted)
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if record.data == data && record.ipfs_hash.as_deref() == Some(ipfs_hash.as_str()) {
                    return Ok(UpsertOutcome::Unchanged);
                }
                record.data = data;
                record.ipfs_hash = Some(ipfs_hash);
                record.updated_at = now;
                Ok(UpsertOutcome::Modified)
            }
        }
    }
}
