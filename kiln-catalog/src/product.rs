use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A sellable option of a marketplace listing, as last synced from the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variation {
    pub listing_id: i64,
    /// `None` for listings that have no variations.
    pub variation_sku: Option<String>,
    pub title: String,
    /// Price currently live on the marketplace.
    pub current_price: Decimal,
}

impl Variation {
    pub fn new(listing_id: i64, variation_sku: Option<String>, title: impl Into<String>, current_price: Decimal) -> Self {
        Self {
            listing_id,
            variation_sku,
            title: title.into(),
            current_price,
        }
    }

    /// Key used for mapping lookups and staging.
    ///
    /// Listings without variations are priced under their listing id.
    pub fn pricing_sku(&self) -> String {
        match &self.variation_sku {
            Some(sku) => sku.clone(),
            None => self.listing_id.to_string(),
        }
    }
}

/// Links a marketplace variation SKU to the seller's own SKU.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkuMapping {
    pub marketplace: String,
    pub variation_sku: String,
    pub internal_sku: String,
    pub active: bool,
}

impl SkuMapping {
    pub fn active(marketplace: impl Into<String>, variation_sku: impl Into<String>, internal_sku: impl Into<String>) -> Self {
        Self {
            marketplace: marketplace.into(),
            variation_sku: variation_sku.into(),
            internal_sku: internal_sku.into(),
            active: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MasterProduct {
    pub internal_sku: String,
    pub name: String,
    pub weight_grams: Option<Decimal>,
    pub material_id: Option<i64>,
    pub postage_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Material {
    pub material_id: i64,
    pub name: String,
    pub cost_per_gram: Option<Decimal>,
    pub sell_price_per_gram: Option<Decimal>,
}
