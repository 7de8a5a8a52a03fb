use kiln_shared::round_money;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::fees::{FeeBreakdown, FeeSchedule, ProfitSummary};
use crate::resolver::CostInputs;

/// Upper bound (inclusive) for a requested net margin, in percent.
pub const MAX_MARGIN_PERCENT: u32 = 70;

/// Cost-plus rule used when no margin is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselinePolicy {
    /// Multiplier over material + postage cost.
    pub markup_multiplier: Decimal,
    pub minimum_price: Option<Decimal>,
}

impl Default for BaselinePolicy {
    fn default() -> Self {
        Self {
            markup_multiplier: dec!(2.0),
            minimum_price: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PricingConfig {
    pub fees: FeeSchedule,
    pub baseline: BaselinePolicy,
}

/// A solved price with everything needed to display or stage it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub base_price: Decimal,
    pub price: Decimal,
    pub fees: FeeBreakdown,
    pub profit: ProfitSummary,
}

/// Check a user-supplied margin against `0..=MAX_MARGIN_PERCENT`.
///
/// Margins are stored with two decimals, so finer values are refused rather
/// than solved at a precision the store cannot keep.
pub fn validate_margin(margin: Decimal) -> Result<Decimal, PricingError> {
    if margin < Decimal::ZERO || margin > Decimal::from(MAX_MARGIN_PERCENT) {
        return Err(PricingError::MarginOutOfRange(margin));
    }
    if margin.normalize().scale() > 2 {
        return Err(PricingError::MarginTooPrecise(margin));
    }
    Ok(margin)
}

/// Derives sale prices from cost inputs. Holds no state beyond its config.
#[derive(Debug, Clone, Default)]
pub struct PriceSolver {
    config: PricingConfig,
}

impl PriceSolver {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn baseline_price(&self, costs: &CostInputs) -> Decimal {
        let policy = &self.config.baseline;
        let mut price = (costs.material_cost + costs.postage_cost) * policy.markup_multiplier;

        if let Some(floor) = policy.minimum_price {
            price = price.max(floor);
        }

        round_money(price)
    }

    /// Price at which the net margin after all fees (ads included) equals `margin` percent.
    pub fn margin_price(&self, costs: &CostInputs, margin: Decimal) -> Result<Decimal, PricingError> {
        let fees = &self.config.fees;
        let fee_multiplier = fees.fee_multiplier();
        let denominator = fee_multiplier - margin / Decimal::ONE_HUNDRED;

        if denominator <= Decimal::ZERO {
            return Err(PricingError::UnsolvableMargin { margin, fee_multiplier });
        }

        let fixed = costs.material_cost + fees.payment_fixed_fee + costs.postage_cost;
        Ok(round_money(fixed / denominator))
    }

    /// Baseline when `modifier` is zero, margin-solved otherwise.
    pub fn quote(&self, costs: &CostInputs, modifier: Decimal) -> Result<Quote, PricingError> {
        if modifier < Decimal::ZERO {
            return Err(PricingError::MarginOutOfRange(modifier));
        }

        let base_price = self.baseline_price(costs);
        let price = if modifier.is_zero() {
            base_price
        } else {
            self.margin_price(costs, modifier)?
        };

        let fees = self.config.fees.fees_for(price);
        Ok(Quote {
            base_price,
            price,
            fees,
            profit: ProfitSummary::at(price, costs, &fees),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("Margin {margin}% cannot be reached: fees leave only {fee_multiplier} of the price")]
    UnsolvableMargin {
        margin: Decimal,
        fee_multiplier: Decimal,
    },

    #[error("Margin {0}% is outside 0..={max}%", max = MAX_MARGIN_PERCENT)]
    MarginOutOfRange(Decimal),

    #[error("Margin {0}% has more than two decimal places")]
    MarginTooPrecise(Decimal),
}
