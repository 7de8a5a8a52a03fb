use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use crate::BoxError;

/// The external marketplace, as seen by the pricing workflow.
///
/// Implementations own authentication and transport; callers only look at
/// success or failure.
#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    /// Price currently live for a variation (or a listing without variations).
    async fn fetch_variation_current_price(
        &self,
        listing_id: i64,
        variation_sku: &str,
    ) -> Result<Decimal, BoxError>;

    /// Replace the live price of a variation.
    async fn update_variation_price(
        &self,
        listing_id: i64,
        variation_sku: &str,
        price: Decimal,
    ) -> Result<(), BoxError>;
}

/// Accepts every update without contacting the marketplace. Used when the
/// service runs with `marketplace.dry_run` enabled.
pub struct DryRunMarketplaceClient;

#[async_trait]
impl MarketplaceClient for DryRunMarketplaceClient {
    async fn fetch_variation_current_price(
        &self,
        listing_id: i64,
        variation_sku: &str,
    ) -> Result<Decimal, BoxError> {
        Err(format!("dry run: no live price for listing {} / {}", listing_id, variation_sku).into())
    }

    async fn update_variation_price(
        &self,
        listing_id: i64,
        variation_sku: &str,
        price: Decimal,
    ) -> Result<(), BoxError> {
        info!("Dry run price update: listing {} sku {} -> {}", listing_id, variation_sku, price);
        Ok(())
    }
}
