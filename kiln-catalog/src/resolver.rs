use std::fmt;

use kiln_shared::round_money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalogue::Catalogue;

/// Which per-gram material price feeds the material cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaterialCostBasis {
    #[default]
    Cost,
    Sell,
}

/// Physical cost inputs for one variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostInputs {
    pub material_cost: Decimal,
    pub weight_grams: Decimal,
    pub postage_cost: Decimal,
}

/// Why a variation could not be priced. Never fatal for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotMapped,
    MissingWeight,
    MissingMaterialPrice,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::NotMapped => "not_mapped",
            SkipReason::MissingWeight => "missing_weight",
            SkipReason::MissingMaterialPrice => "missing_material_price",
        };
        f.write_str(reason)
    }
}

/// Follows variation SKU -> active mapping -> master product -> material.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostResolver {
    basis: MaterialCostBasis,
}

impl CostResolver {
    pub fn new(basis: MaterialCostBasis) -> Self {
        Self { basis }
    }

    pub fn resolve(&self, catalogue: &Catalogue, pricing_sku: &str) -> Result<CostInputs, SkipReason> {
        let mapping = catalogue
            .active_mapping(pricing_sku)
            .ok_or(SkipReason::NotMapped)?;

        let product = catalogue
            .product(&mapping.internal_sku)
            .ok_or(SkipReason::NotMapped)?;

        let weight_grams = product
            .weight_grams
            .filter(|w| *w > Decimal::ZERO)
            .ok_or(SkipReason::MissingWeight)?;

        let material = product
            .material_id
            .and_then(|id| catalogue.material(id))
            .ok_or(SkipReason::MissingMaterialPrice)?;

        let per_gram = match self.basis {
            MaterialCostBasis::Cost => material.cost_per_gram,
            MaterialCostBasis::Sell => material.sell_price_per_gram,
        }
        .filter(|p| *p > Decimal::ZERO)
        .ok_or(SkipReason::MissingMaterialPrice)?;

        // A weight too small to cost anything would stage a zero price
        let material_cost = round_money(weight_grams * per_gram);
        if material_cost <= Decimal::ZERO {
            return Err(SkipReason::MissingMaterialPrice);
        }

        Ok(CostInputs {
            material_cost,
            weight_grams,
            postage_cost: product.postage_cost,
        })
    }
}
