pub mod marketplace;
pub mod repository;

pub use marketplace::{DryRunMarketplaceClient, MarketplaceClient};
pub use repository::{CatalogRepository, InMemoryCatalogRepository};

/// Error type returned across adapter and repository boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
