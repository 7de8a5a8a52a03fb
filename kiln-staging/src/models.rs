use chrono::{DateTime, Utc};
use kiln_catalog::{CostInputs, FeeBreakdown, PriceSolver, PricingError, ProfitSummary};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::lifecycle::{Action, Lifecycle, StagingStatus, TransitionError};

/// Identity of a staged price: one per marketplace variation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StagingKey {
    pub listing_id: i64,
    pub variation_sku: String,
}

impl StagingKey {
    pub fn new(listing_id: i64, variation_sku: impl Into<String>) -> Self {
        Self {
            listing_id,
            variation_sku: variation_sku.into(),
        }
    }
}

/// A price proposal for one variation, tracked through approval.
///
/// Prices and fees are only ever written from a solver quote, so the stored
/// price always matches its cost snapshot and margin modifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagingRecord {
    #[serde(flatten)]
    key: StagingKey,
    current_price: Decimal,
    #[serde(flatten)]
    costs: CostInputs,
    margin_modifier: Decimal,
    base_calculated_price: Decimal,
    calculated_price: Decimal,
    fees: FeeBreakdown,
    profit: ProfitSummary,
    #[serde(flatten)]
    lifecycle: Lifecycle,
    calculated_at: DateTime<Utc>,
    last_push_error: Option<String>,
}

/// Every column of a staging record, as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingSnapshot {
    pub key: StagingKey,
    pub current_price: Decimal,
    pub costs: CostInputs,
    pub margin_modifier: Decimal,
    pub base_calculated_price: Decimal,
    pub calculated_price: Decimal,
    pub fees: FeeBreakdown,
    pub profit: ProfitSummary,
    pub lifecycle: Lifecycle,
    pub calculated_at: DateTime<Utc>,
    pub last_push_error: Option<String>,
}

impl StagingRecord {
    /// First calculation for a variation.
    pub fn calculate(
        key: StagingKey,
        current_price: Decimal,
        costs: CostInputs,
        margin_modifier: Decimal,
        solver: &PriceSolver,
        at: DateTime<Utc>,
    ) -> Result<Self, PricingError> {
        let quote = solver.quote(&costs, margin_modifier)?;

        Ok(Self {
            key,
            current_price,
            costs,
            margin_modifier,
            base_calculated_price: quote.base_price,
            calculated_price: quote.price,
            fees: quote.fees,
            profit: quote.profit,
            lifecycle: Lifecycle::Pending,
            calculated_at: at,
            last_push_error: None,
        })
    }

    /// Start a new calculation cycle with fresh cost inputs.
    ///
    /// Nothing changes unless both the transition and the solve succeed.
    pub fn recalculate(
        &mut self,
        current_price: Decimal,
        costs: CostInputs,
        solver: &PriceSolver,
        force: bool,
        at: DateTime<Utc>,
    ) -> Result<(), RecordError> {
        let lifecycle = self.lifecycle.recalculate(force)?;
        let quote = solver.quote(&costs, self.margin_modifier)?;

        self.current_price = current_price;
        self.costs = costs;
        self.base_calculated_price = quote.base_price;
        self.calculated_price = quote.price;
        self.fees = quote.fees;
        self.profit = quote.profit;
        self.lifecycle = lifecycle;
        self.calculated_at = at;
        self.last_push_error = None;
        Ok(())
    }

    /// Change the target margin and re-solve against the frozen cost snapshot.
    /// The approval state is left as it is.
    pub fn set_margin_modifier(
        &mut self,
        margin_modifier: Decimal,
        solver: &PriceSolver,
        at: DateTime<Utc>,
    ) -> Result<(), RecordError> {
        self.lifecycle.ensure_mutable(Action::EditModifier)?;
        let quote = solver.quote(&self.costs, margin_modifier)?;

        self.margin_modifier = margin_modifier;
        self.base_calculated_price = quote.base_price;
        self.calculated_price = quote.price;
        self.fees = quote.fees;
        self.profit = quote.profit;
        self.calculated_at = at;
        Ok(())
    }

    pub fn set_current_price(&mut self, current_price: Decimal) -> Result<(), TransitionError> {
        self.lifecycle.ensure_mutable(Action::RefreshPrice)?;
        self.current_price = current_price;
        Ok(())
    }

    pub fn approve(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.lifecycle = self.lifecycle.approve(at)?;
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), TransitionError> {
        self.lifecycle = self.lifecycle.reject()?;
        Ok(())
    }

    pub fn mark_pushed(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.lifecycle = self.lifecycle.push(at)?;
        self.last_push_error = None;
        Ok(())
    }

    /// Keep the record approved and remember why the marketplace refused it.
    pub fn record_push_failure(&mut self, error: impl Into<String>) {
        self.last_push_error = Some(error.into());
    }

    pub fn key(&self) -> &StagingKey {
        &self.key
    }

    pub fn sku(&self) -> &str {
        &self.key.variation_sku
    }

    pub fn status(&self) -> StagingStatus {
        self.lifecycle.status()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn current_price(&self) -> Decimal {
        self.current_price
    }

    pub fn costs(&self) -> &CostInputs {
        &self.costs
    }

    pub fn margin_modifier(&self) -> Decimal {
        self.margin_modifier
    }

    pub fn base_calculated_price(&self) -> Decimal {
        self.base_calculated_price
    }

    pub fn calculated_price(&self) -> Decimal {
        self.calculated_price
    }

    pub fn fees(&self) -> &FeeBreakdown {
        &self.fees
    }

    pub fn profit(&self) -> &ProfitSummary {
        &self.profit
    }

    pub fn calculated_at(&self) -> DateTime<Utc> {
        self.calculated_at
    }

    pub fn last_push_error(&self) -> Option<&str> {
        self.last_push_error.as_deref()
    }

    pub fn snapshot(&self) -> StagingSnapshot {
        StagingSnapshot {
            key: self.key.clone(),
            current_price: self.current_price,
            costs: self.costs,
            margin_modifier: self.margin_modifier,
            base_calculated_price: self.base_calculated_price,
            calculated_price: self.calculated_price,
            fees: self.fees,
            profit: self.profit,
            lifecycle: self.lifecycle,
            calculated_at: self.calculated_at,
            last_push_error: self.last_push_error.clone(),
        }
    }
}

impl From<StagingSnapshot> for StagingRecord {
    fn from(snapshot: StagingSnapshot) -> Self {
        Self {
            key: snapshot.key,
            current_price: snapshot.current_price,
            costs: snapshot.costs,
            margin_modifier: snapshot.margin_modifier,
            base_calculated_price: snapshot.base_calculated_price,
            calculated_price: snapshot.calculated_price,
            fees: snapshot.fees,
            profit: snapshot.profit,
            lifecycle: snapshot.lifecycle,
            calculated_at: snapshot.calculated_at,
            last_push_error: snapshot.last_push_error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn costs() -> CostInputs {
        CostInputs {
            material_cost: dec!(8.50),
            weight_grams: dec!(5),
            postage_cost: dec!(2.00),
        }
    }

    fn record(solver: &PriceSolver) -> StagingRecord {
        StagingRecord::calculate(StagingKey::new(1, "V-1"), dec!(19.99), costs(), Decimal::ZERO, solver, Utc::now())
            .unwrap()
    }

    #[test]
    fn test_new_record_is_pending_at_baseline() {
        let solver = PriceSolver::default();
        let record = record(&solver);

        assert_eq!(record.status(), StagingStatus::Pending);
        assert_eq!(record.calculated_price(), record.base_calculated_price());
        assert_eq!(record.calculated_price(), dec!(21.00));
    }

    #[test]
    fn test_modifier_edit_keeps_status() {
        let solver = PriceSolver::default();
        let mut record = record(&solver);
        record.approve(Utc::now()).unwrap();

        record.set_margin_modifier(dec!(30), &solver, Utc::now()).unwrap();

        assert_eq!(record.status(), StagingStatus::Approved);
        assert_eq!(record.calculated_price(), dec!(24.04));
        assert_eq!(record.base_calculated_price(), dec!(21.00));
    }

    #[test]
    fn test_unsolvable_edit_leaves_record_unchanged() {
        let solver = PriceSolver::default();
        let mut record = record(&solver);
        let before = record.clone();

        let result = record.set_margin_modifier(dec!(80), &solver, Utc::now());

        assert!(matches!(result, Err(RecordError::Pricing(PricingError::UnsolvableMargin { .. }))));
        assert_eq!(record, before);
    }

    #[test]
    fn test_pushed_record_is_frozen() {
        let solver = PriceSolver::default();
        let mut record = record(&solver);
        record.approve(Utc::now()).unwrap();
        record.mark_pushed(Utc::now()).unwrap();
        let before = record.clone();

        assert!(record.set_margin_modifier(dec!(20), &solver, Utc::now()).is_err());
        assert!(record.set_current_price(dec!(1)).is_err());
        assert!(record.recalculate(dec!(1), costs(), &solver, false, Utc::now()).is_err());
        assert_eq!(record, before);

        record.recalculate(dec!(21.00), costs(), &solver, true, Utc::now()).unwrap();
        assert_eq!(record.status(), StagingStatus::Pending);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let solver = PriceSolver::default();
        let record = record(&solver);
        assert_eq!(StagingRecord::from(record.snapshot()), record);
    }
}
