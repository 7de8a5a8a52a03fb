use std::sync::Arc;

use chrono::Utc;
use kiln_catalog::{
    validate_margin, Catalogue, CostResolver, MaterialCostBasis, PriceSolver, PricingConfig, PricingError,
    Variation,
};
use kiln_core::{BoxError, CatalogRepository, MarketplaceClient};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::lifecycle::{StagingStatus, TransitionError};
use crate::models::{RecordError, StagingKey, StagingRecord};
use crate::report::{
    BatchReport, CalculationReport, PushReport, RefreshReport, SkipCause, SkippedSku, SkuFailure, StagingStats,
};
use crate::repository::{StagingFilter, StagingRepository};

/// What a recalculation pass does with prices that are approved but not yet pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApprovedRecalculation {
    /// Re-solve and send back to pending.
    #[default]
    Recalculate,
    /// Leave approved prices untouched until they are pushed or rejected.
    Preserve,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    #[serde(flatten)]
    pub pricing: PricingConfig,
    pub material_cost_basis: MaterialCostBasis,
    pub approved_recalculation: ApprovedRecalculation,
}

/// Drives staged prices from calculation through approval to the marketplace.
///
/// All mutating operations are serialized through one writer lock; `list`
/// and `stats` read the store directly.
pub struct PricingWorkflow {
    catalog: Arc<dyn CatalogRepository>,
    staging: Arc<dyn StagingRepository>,
    marketplace: Arc<dyn MarketplaceClient>,
    resolver: CostResolver,
    solver: PriceSolver,
    approved_recalculation: ApprovedRecalculation,
    writer: Mutex<()>,
}

enum Calculation {
    Written,
    Skipped(SkippedSku),
}

impl PricingWorkflow {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        staging: Arc<dyn StagingRepository>,
        marketplace: Arc<dyn MarketplaceClient>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            catalog,
            staging,
            marketplace,
            resolver: CostResolver::new(settings.material_cost_basis),
            solver: PriceSolver::new(settings.pricing),
            approved_recalculation: settings.approved_recalculation,
            writer: Mutex::new(()),
        }
    }

    /// Resolve and price every variation in the catalogue.
    pub async fn calculate_all(&self) -> Result<CalculationReport, WorkflowError> {
        let _writer = self.writer.lock().await;
        let catalogue = self.load_catalogue().await?;
        let mut report = CalculationReport::default();

        for variation in catalogue.variations() {
            match self.calculate_one(&catalogue, variation, false).await {
                Calculation::Written => report.record_calculated(),
                Calculation::Skipped(skip) => report.record_skip(skip),
            }
        }

        info!(
            "Calculation pass finished: {} calculated, {} skipped",
            report.calculated, report.skipped
        );
        Ok(report)
    }

    /// Recalculate selected SKUs. `force` starts a new cycle for pushed records too.
    pub async fn recalculate(&self, skus: &[String], force: bool) -> Result<CalculationReport, WorkflowError> {
        let _writer = self.writer.lock().await;
        let catalogue = self.load_catalogue().await?;
        let mut report = CalculationReport::default();

        for sku in skus {
            let Some(variation) = catalogue.variation(sku) else {
                report.record_skip(SkippedSku::new(sku, SkipCause::NotStaged, "variation is not in the catalogue"));
                continue;
            };

            match self.calculate_one(&catalogue, variation, force).await {
                Calculation::Written => report.record_calculated(),
                Calculation::Skipped(skip) => report.record_skip(skip),
            }
        }

        info!(
            "Recalculated {} of {} SKUs (force: {})",
            report.calculated,
            skus.len(),
            force
        );
        Ok(report)
    }

    /// Price one variation. Every per-record problem, storage included,
    /// comes back as a skip so the rest of the pass carries on.
    async fn calculate_one(&self, catalogue: &Catalogue, variation: &Variation, force: bool) -> Calculation {
        let sku = variation.pricing_sku();

        let costs = match self.resolver.resolve(catalogue, &sku) {
            Ok(costs) => costs,
            Err(reason) => {
                debug!("Skipping {}: {}", sku, reason);
                return Calculation::Skipped(SkippedSku::new(sku, reason.into(), reason.to_string()));
            }
        };

        let existing = match self.staging.get(&sku).await {
            Ok(existing) => existing,
            Err(e) => {
                error!("Failed to read staged price for {}: {}", sku, e);
                return Calculation::Skipped(SkippedSku::new(sku, SkipCause::StorageFailure, e.to_string()));
            }
        };

        let now = Utc::now();
        let record = match existing {
            None => {
                let key = StagingKey::new(variation.listing_id, sku.clone());
                match StagingRecord::calculate(key, variation.current_price, costs, Decimal::ZERO, &self.solver, now) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("Could not price {}: {}", sku, e);
                        return Calculation::Skipped(SkippedSku::new(sku, SkipCause::UnsolvableMargin, e.to_string()));
                    }
                }
            }
            Some(mut record) => {
                if !force
                    && self.approved_recalculation == ApprovedRecalculation::Preserve
                    && record.status() == StagingStatus::Approved
                {
                    return Calculation::Skipped(SkippedSku::new(
                        sku,
                        SkipCause::ApprovedPreserved,
                        "approved price kept until pushed or rejected",
                    ));
                }

                match record.recalculate(variation.current_price, costs, &self.solver, force, now) {
                    Ok(()) => record,
                    Err(RecordError::Transition(e)) => {
                        return Calculation::Skipped(SkippedSku::new(sku, SkipCause::AlreadyPushed, e.to_string()));
                    }
                    Err(RecordError::Pricing(e)) => {
                        warn!("Margin for {} no longer solvable: {}", sku, e);
                        return Calculation::Skipped(SkippedSku::new(sku, SkipCause::UnsolvableMargin, e.to_string()));
                    }
                }
            }
        };

        if let Err(skip) = self.save(&record).await {
            return Calculation::Skipped(skip);
        }
        debug!("Staged {} at {}", record.sku(), record.calculated_price());
        Calculation::Written
    }

    /// Set the same target margin on many SKUs. Each SKU succeeds or fails on its own.
    pub async fn apply_bulk_margin(&self, skus: &[String], margin: Decimal) -> Result<BatchReport, WorkflowError> {
        let margin = validate_margin(margin)?;
        let _writer = self.writer.lock().await;
        let mut report = BatchReport::default();

        for sku in skus {
            let mut record = match self.find(sku).await {
                Ok(record) => record,
                Err(skip) => {
                    report.record_skip(skip);
                    continue;
                }
            };

            if let Err(e) = record.set_margin_modifier(margin, &self.solver, Utc::now()) {
                let cause = match e {
                    RecordError::Transition(_) => SkipCause::InvalidTransition,
                    RecordError::Pricing(_) => SkipCause::UnsolvableMargin,
                };
                report.record_skip(SkippedSku::new(sku, cause, e.to_string()));
                continue;
            }

            match self.save(&record).await {
                Ok(()) => report.record_updated(record),
                Err(skip) => report.record_skip(skip),
            }
        }

        info!("Applied {}% margin to {} of {} SKUs", margin, report.updated_count, skus.len());
        Ok(report)
    }

    /// Edit the margin modifier of one record.
    pub async fn update_modifier(&self, sku: &str, margin: Decimal) -> Result<StagingRecord, WorkflowError> {
        let margin = validate_margin(margin)?;
        let _writer = self.writer.lock().await;

        let mut record = self
            .staging
            .get(sku)
            .await
            .map_err(WorkflowError::storage)?
            .ok_or_else(|| WorkflowError::NotFound(sku.to_string()))?;

        record.set_margin_modifier(margin, &self.solver, Utc::now())?;
        self.staging.upsert(&record).await.map_err(WorkflowError::storage)?;

        Ok(record)
    }

    pub async fn approve(&self, skus: &[String]) -> Result<BatchReport, WorkflowError> {
        let now = Utc::now();
        self.transition_batch(skus, "approve", |record| record.approve(now)).await
    }

    pub async fn reject(&self, skus: &[String]) -> Result<BatchReport, WorkflowError> {
        self.transition_batch(skus, "reject", |record| record.reject()).await
    }

    async fn transition_batch<F>(&self, skus: &[String], label: &str, transition: F) -> Result<BatchReport, WorkflowError>
    where
        F: Fn(&mut StagingRecord) -> Result<(), TransitionError>,
    {
        let _writer = self.writer.lock().await;
        let mut report = BatchReport::default();

        for sku in skus {
            let mut record = match self.find(sku).await {
                Ok(record) => record,
                Err(skip) => {
                    report.record_skip(skip);
                    continue;
                }
            };

            if let Err(e) = transition(&mut record) {
                report.record_skip(SkippedSku::new(sku, SkipCause::InvalidTransition, e.to_string()));
                continue;
            }

            match self.save(&record).await {
                Ok(()) => report.record_updated(record),
                Err(skip) => report.record_skip(skip),
            }
        }

        info!(
            "Batch {}: {} updated, {} skipped",
            label, report.updated_count, report.skipped_count
        );
        Ok(report)
    }

    /// Send approved prices to the marketplace, one SKU at a time in the given order.
    pub async fn push_selected(&self, skus: &[String]) -> Result<PushReport, WorkflowError> {
        let _writer = self.writer.lock().await;
        let mut report = PushReport::default();

        for sku in skus {
            let mut record = match self.find(sku).await {
                Ok(record) => record,
                Err(skip) => {
                    report.skipped.push(skip);
                    continue;
                }
            };

            if record.status() != StagingStatus::Approved {
                report.skipped.push(SkippedSku::new(
                    sku,
                    SkipCause::InvalidTransition,
                    format!("only approved prices are pushed, {} is {}", sku, record.status()),
                ));
                continue;
            }

            let listing_id = record.key().listing_id;
            let price = record.calculated_price();

            match self.marketplace.update_variation_price(listing_id, sku, price).await {
                Ok(()) => {
                    if let Err(e) = record.mark_pushed(Utc::now()) {
                        report.record_failure(sku, e.to_string());
                        continue;
                    }
                    match self.save(&record).await {
                        Ok(()) => {
                            info!("Pushed {} at {}", sku, price);
                            report.record_pushed(sku);
                        }
                        Err(skip) => {
                            error!("Marketplace accepted {} but the staging store did not: {}", sku, skip.detail);
                            report.record_failure(sku, format!("pushed but not recorded: {}", skip.detail));
                        }
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!("Push failed for {}: {}", sku, message);
                    record.record_push_failure(message.clone());
                    if let Err(skip) = self.save(&record).await {
                        error!("Could not record push failure for {}: {}", sku, skip.detail);
                    }
                    report.record_failure(sku, message);
                }
            }
        }

        info!(
            "Push finished: {} pushed, {} failed, {} skipped",
            report.pushed_count,
            report.failed_count,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Pull live marketplace prices into the reference field of staged records.
    pub async fn refresh_current_prices(&self, skus: &[String]) -> Result<RefreshReport, WorkflowError> {
        let _writer = self.writer.lock().await;
        let mut report = RefreshReport::default();

        for sku in skus {
            let mut record = match self.find(sku).await {
                Ok(record) => record,
                Err(skip) => {
                    report.skipped.push(skip);
                    continue;
                }
            };

            if record.status() == StagingStatus::Pushed {
                report.skipped.push(SkippedSku::new(sku, SkipCause::AlreadyPushed, "pushed records are frozen"));
                continue;
            }

            let live = match self
                .marketplace
                .fetch_variation_current_price(record.key().listing_id, sku)
                .await
            {
                Ok(price) => price,
                Err(e) => {
                    warn!("Could not fetch live price for {}: {}", sku, e);
                    report.failures.push(SkuFailure {
                        sku: sku.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if let Err(e) = record.set_current_price(live) {
                report.skipped.push(SkippedSku::new(sku, SkipCause::InvalidTransition, e.to_string()));
                continue;
            }

            match self.save(&record).await {
                Ok(()) => report.refreshed.push(record),
                Err(skip) => report.skipped.push(skip),
            }
        }

        Ok(report)
    }

    pub async fn list(&self, filter: &StagingFilter) -> Result<Vec<StagingRecord>, WorkflowError> {
        self.staging.list(filter).await.map_err(WorkflowError::storage)
    }

    pub async fn stats(&self) -> Result<StagingStats, WorkflowError> {
        let records = self.list(&StagingFilter::default()).await?;
        Ok(StagingStats::from_records(&records))
    }

    async fn load_catalogue(&self) -> Result<Catalogue, WorkflowError> {
        self.catalog.load_catalogue().await.map_err(|e| {
            error!("Failed to load catalogue: {}", e);
            WorkflowError::Catalog(e.to_string())
        })
    }

    /// Per-item lookup for batches: storage trouble becomes a skip for that SKU.
    async fn find(&self, sku: &str) -> Result<StagingRecord, SkippedSku> {
        match self.staging.get(sku).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(SkippedSku::new(sku, SkipCause::NotStaged, "no staged price")),
            Err(e) => {
                error!("Failed to read staged price for {}: {}", sku, e);
                Err(SkippedSku::new(sku, SkipCause::StorageFailure, e.to_string()))
            }
        }
    }

    async fn save(&self, record: &StagingRecord) -> Result<(), SkippedSku> {
        self.staging.upsert(record).await.map_err(|e| {
            error!("Failed to write staged price for {}: {}", record.sku(), e);
            SkippedSku::new(record.sku(), SkipCause::StorageFailure, e.to_string())
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("No staged price for {0}")]
    NotFound(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("Staging store failure: {0}")]
    Storage(String),

    #[error("Catalogue unavailable: {0}")]
    Catalog(String),
}

impl WorkflowError {
    fn storage(e: BoxError) -> Self {
        error!("Staging store failure: {}", e);
        WorkflowError::Storage(e.to_string())
    }
}

impl From<RecordError> for WorkflowError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::Transition(e) => WorkflowError::InvalidTransition(e),
            RecordError::Pricing(e) => WorkflowError::Pricing(e),
        }
    }
}
