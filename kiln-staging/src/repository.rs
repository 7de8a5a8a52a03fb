use std::collections::BTreeMap;

use async_trait::async_trait;
use kiln_core::BoxError;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::lifecycle::StagingStatus;
use crate::models::{StagingKey, StagingRecord};

/// Narrowing applied when listing staged records.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StagingFilter {
    pub status: Option<StagingStatus>,
    pub listing_id: Option<i64>,
    /// Case-insensitive substring of the variation SKU.
    #[serde(alias = "q")]
    pub sku_contains: Option<String>,
}

impl StagingFilter {
    pub fn with_status(status: StagingStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &StagingRecord) -> bool {
        if let Some(status) = self.status {
            if record.status() != status {
                return false;
            }
        }
        if let Some(listing_id) = self.listing_id {
            if record.key().listing_id != listing_id {
                return false;
            }
        }
        if let Some(needle) = &self.sku_contains {
            if !record.sku().to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Persistence for staged prices. Each write replaces one whole record.
#[async_trait]
pub trait StagingRepository: Send + Sync {
    async fn get(&self, variation_sku: &str) -> Result<Option<StagingRecord>, BoxError>;

    /// Insert or replace the record stored under `record.key()`.
    async fn upsert(&self, record: &StagingRecord) -> Result<(), BoxError>;

    /// Records matching `filter`, ordered by listing then SKU.
    async fn list(&self, filter: &StagingFilter) -> Result<Vec<StagingRecord>, BoxError>;
}

/// Staging store held in memory, for tests and local runs.
#[derive(Default)]
pub struct InMemoryStagingRepository {
    records: RwLock<BTreeMap<StagingKey, StagingRecord>>,
}

impl InMemoryStagingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StagingRepository for InMemoryStagingRepository {
    async fn get(&self, variation_sku: &str) -> Result<Option<StagingRecord>, BoxError> {
        let records = self.records.read().await;
        Ok(records.values().find(|r| r.sku() == variation_sku).cloned())
    }

    async fn upsert(&self, record: &StagingRecord) -> Result<(), BoxError> {
        self.records
            .write()
            .await
            .insert(record.key().clone(), record.clone());
        Ok(())
    }

    async fn list(&self, filter: &StagingFilter) -> Result<Vec<StagingRecord>, BoxError> {
        let records = self.records.read().await;
        Ok(records.values().filter(|r| filter.matches(r)).cloned().collect())
    }
}
