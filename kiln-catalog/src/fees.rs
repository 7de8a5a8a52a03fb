use kiln_shared::{percent_of, round_money};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::resolver::CostInputs;

/// Marketplace fee rates. Rates are fractions (0.065 = 6.5%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub transaction_rate: Decimal,
    pub payment_rate: Decimal,
    pub payment_fixed_fee: Decimal,
    pub ad_rate: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            transaction_rate: dec!(0.065),
            payment_rate: dec!(0.04),
            payment_fixed_fee: dec!(0.20),
            ad_rate: dec!(0.15),
        }
    }
}

impl FeeSchedule {
    /// Share of the sale price left after all proportional fees.
    pub fn fee_multiplier(&self) -> Decimal {
        Decimal::ONE - self.transaction_rate - self.payment_rate - self.ad_rate
    }

    /// Fees at `price` for a sale that came through advertising.
    pub fn fees_for(&self, price: Decimal) -> FeeBreakdown {
        FeeBreakdown::new(
            round_money(price * self.transaction_rate),
            round_money(price * self.payment_rate + self.payment_fixed_fee),
            round_money(price * self.ad_rate),
        )
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub transaction_fee: Decimal,
    pub payment_fee: Decimal,
    pub ad_fee: Decimal,
    pub total_fees: Decimal,
}

impl FeeBreakdown {
    pub fn new(transaction_fee: Decimal, payment_fee: Decimal, ad_fee: Decimal) -> Self {
        Self {
            transaction_fee,
            payment_fee,
            ad_fee,
            total_fees: transaction_fee + payment_fee + ad_fee,
        }
    }
}

/// Profit and margin figures for one price point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitSummary {
    pub profit_no_ads: Decimal,
    pub profit_with_ads: Decimal,
    pub margin_no_ads: Decimal,
    pub margin_with_ads: Decimal,
}

impl ProfitSummary {
    pub fn at(price: Decimal, costs: &CostInputs, fees: &FeeBreakdown) -> Self {
        let profit_no_ads = price
            - costs.material_cost
            - fees.transaction_fee
            - fees.payment_fee
            - costs.postage_cost;
        let profit_with_ads = profit_no_ads - fees.ad_fee;

        Self {
            profit_no_ads,
            profit_with_ads,
            margin_no_ads: round_money(percent_of(profit_no_ads, price)),
            margin_with_ads: round_money(percent_of(profit_with_ads, price)),
        }
    }
}
