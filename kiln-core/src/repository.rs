use async_trait::async_trait;
use kiln_catalog::Catalogue;
use tokio::sync::RwLock;

use crate::BoxError;

/// Read access to the seller's catalogue. Writes belong to catalogue maintenance.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Load a consistent snapshot of variations, mappings, products and materials.
    async fn load_catalogue(&self) -> Result<Catalogue, BoxError>;
}

/// Catalogue held in memory, for tests and local runs.
pub struct InMemoryCatalogRepository {
    catalogue: RwLock<Catalogue>,
}

impl InMemoryCatalogRepository {
    pub fn new(catalogue: Catalogue) -> Self {
        Self {
            catalogue: RwLock::new(catalogue),
        }
    }

    /// Swap in a new catalogue, as a sync from the marketplace would.
    pub async fn replace(&self, catalogue: Catalogue) {
        *self.catalogue.write().await = catalogue;
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn load_catalogue(&self) -> Result<Catalogue, BoxError> {
        Ok(self.catalogue.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_catalog::Variation;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_replace_snapshot() {
        let repo = InMemoryCatalogRepository::new(Catalogue::new("etsy"));
        assert!(repo.load_catalogue().await.unwrap().variations().is_empty());

        let mut next = Catalogue::new("etsy");
        next.add_variation(Variation::new(1, Some("V-1".into()), "Ring", dec!(20)));
        repo.replace(next).await;

        assert_eq!(repo.load_catalogue().await.unwrap().variations().len(), 1);
    }
}
