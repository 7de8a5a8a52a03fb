use kiln_catalog::SkipReason;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::lifecycle::StagingStatus;
use crate::models::StagingRecord;

/// Why one SKU in a batch was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipCause {
    NotMapped,
    MissingWeight,
    MissingMaterialPrice,
    AlreadyPushed,
    ApprovedPreserved,
    UnsolvableMargin,
    NotStaged,
    InvalidTransition,
    StorageFailure,
}

impl From<SkipReason> for SkipCause {
    fn from(reason: SkipReason) -> Self {
        match reason {
            SkipReason::NotMapped => SkipCause::NotMapped,
            SkipReason::MissingWeight => SkipCause::MissingWeight,
            SkipReason::MissingMaterialPrice => SkipCause::MissingMaterialPrice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSku {
    pub sku: String,
    pub cause: SkipCause,
    pub detail: String,
}

impl SkippedSku {
    pub fn new(sku: impl Into<String>, cause: SkipCause, detail: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            cause,
            detail: detail.into(),
        }
    }
}

/// A SKU whose marketplace call failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkuFailure {
    pub sku: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CalculationReport {
    pub calculated: usize,
    pub skipped: usize,
    pub skips: Vec<SkippedSku>,
}

impl CalculationReport {
    pub(crate) fn record_calculated(&mut self) {
        self.calculated += 1;
    }

    pub(crate) fn record_skip(&mut self, skip: SkippedSku) {
        self.skipped += 1;
        self.skips.push(skip);
    }

    pub fn skipped_with(&self, cause: SkipCause) -> usize {
        self.skips.iter().filter(|s| s.cause == cause).count()
    }
}

/// Outcome of approve, reject and bulk-margin batches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub updated_count: usize,
    pub skipped_count: usize,
    pub updated: Vec<StagingRecord>,
    pub skipped: Vec<SkippedSku>,
}

impl BatchReport {
    pub(crate) fn record_updated(&mut self, record: StagingRecord) {
        self.updated_count += 1;
        self.updated.push(record);
    }

    pub(crate) fn record_skip(&mut self, skip: SkippedSku) {
        self.skipped_count += 1;
        self.skipped.push(skip);
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PushReport {
    pub pushed_count: usize,
    pub failed_count: usize,
    pub pushed: Vec<String>,
    pub failures: Vec<SkuFailure>,
    pub skipped: Vec<SkippedSku>,
}

impl PushReport {
    pub(crate) fn record_pushed(&mut self, sku: &str) {
        self.pushed_count += 1;
        self.pushed.push(sku.to_string());
    }

    pub(crate) fn record_failure(&mut self, sku: &str, error: impl Into<String>) {
        self.failed_count += 1;
        self.failures.push(SkuFailure {
            sku: sku.to_string(),
            error: error.into(),
        });
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshReport {
    pub refreshed: Vec<StagingRecord>,
    pub failures: Vec<SkuFailure>,
    pub skipped: Vec<SkippedSku>,
}

/// Counts per status and average margins for the staging dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StagingStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub pushed: usize,
    pub average_margin_no_ads: Decimal,
    pub average_margin_with_ads: Decimal,
}

impl StagingStats {
    pub fn from_records(records: &[StagingRecord]) -> Self {
        let mut stats = StagingStats {
            total: records.len(),
            ..Self::default()
        };

        let mut priced = 0u32;
        let mut margin_no_ads = Decimal::ZERO;
        let mut margin_with_ads = Decimal::ZERO;

        for record in records {
            match record.status() {
                StagingStatus::Pending => stats.pending += 1,
                StagingStatus::Approved => stats.approved += 1,
                StagingStatus::Rejected => stats.rejected += 1,
                StagingStatus::Pushed => stats.pushed += 1,
            }

            if record.calculated_price() > Decimal::ZERO {
                priced += 1;
                margin_no_ads += record.profit().margin_no_ads;
                margin_with_ads += record.profit().margin_with_ads;
            }
        }

        if priced > 0 {
            let count = Decimal::from(priced);
            stats.average_margin_no_ads = kiln_shared::round_money(margin_no_ads / count);
            stats.average_margin_with_ads = kiln_shared::round_money(margin_with_ads / count);
        }

        stats
    }
}
