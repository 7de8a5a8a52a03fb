use std::collections::HashMap;

use crate::product::{MasterProduct, Material, SkuMapping, Variation};

/// Read-only snapshot of the seller's catalogue for one marketplace.
///
/// A pricing pass works against a single snapshot so every variation in the
/// pass is resolved against the same catalogue state.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    marketplace: String,
    variations: Vec<Variation>,
    mappings: Vec<SkuMapping>,
    active_mappings: HashMap<String, usize>,
    products: HashMap<String, MasterProduct>,
    materials: HashMap<i64, Material>,
}

impl Catalogue {
    pub fn new(marketplace: impl Into<String>) -> Self {
        Self {
            marketplace: marketplace.into(),
            ..Self::default()
        }
    }

    pub fn add_variation(&mut self, variation: Variation) {
        self.variations.push(variation);
    }

    /// Register a mapping. Only one active mapping may exist per variation SKU.
    pub fn add_mapping(&mut self, mapping: SkuMapping) -> Result<(), CatalogError> {
        if mapping.marketplace != self.marketplace {
            return Err(CatalogError::ForeignMarketplace {
                expected: self.marketplace.clone(),
                found: mapping.marketplace,
            });
        }

        if mapping.active {
            if self.active_mappings.contains_key(&mapping.variation_sku) {
                return Err(CatalogError::DuplicateActiveMapping(mapping.variation_sku));
            }
            self.active_mappings
                .insert(mapping.variation_sku.clone(), self.mappings.len());
        }

        self.mappings.push(mapping);
        Ok(())
    }

    pub fn add_product(&mut self, product: MasterProduct) {
        self.products.insert(product.internal_sku.clone(), product);
    }

    pub fn add_material(&mut self, material: Material) {
        self.materials.insert(material.material_id, material);
    }

    /// Variations in the order they were added.
    pub fn variations(&self) -> &[Variation] {
        &self.variations
    }

    pub fn variation(&self, pricing_sku: &str) -> Option<&Variation> {
        self.variations.iter().find(|v| v.pricing_sku() == pricing_sku)
    }

    pub fn active_mapping(&self, variation_sku: &str) -> Option<&SkuMapping> {
        self.active_mappings
            .get(variation_sku)
            .map(|idx| &self.mappings[*idx])
    }

    pub fn product(&self, internal_sku: &str) -> Option<&MasterProduct> {
        self.products.get(internal_sku)
    }

    pub fn material(&self, material_id: i64) -> Option<&Material> {
        self.materials.get(&material_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Variation {0} already has an active mapping")]
    DuplicateActiveMapping(String),

    #[error("Mapping belongs to marketplace {found}, catalogue is for {expected}")]
    ForeignMarketplace { expected: String, found: String },
}
