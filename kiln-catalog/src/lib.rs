pub mod product;
pub mod catalogue;
pub mod resolver;
pub mod fees;
pub mod pricing;

pub use product::{MasterProduct, Material, SkuMapping, Variation};
pub use catalogue::{Catalogue, CatalogError};
pub use resolver::{CostInputs, CostResolver, MaterialCostBasis, SkipReason};
pub use fees::{FeeBreakdown, FeeSchedule, ProfitSummary};
pub use pricing::{validate_margin, BaselinePolicy, PriceSolver, PricingConfig, PricingError, Quote};
