use async_trait::async_trait;
use kiln_catalog::{Catalogue, MasterProduct, Material, SkuMapping, Variation};
use kiln_core::{BoxError, CatalogRepository};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::debug;

/// Reads the catalogue for one marketplace out of Postgres.
pub struct PgCatalogRepository {
    pool: PgPool,
    marketplace: String,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool, marketplace: impl Into<String>) -> Self {
        Self {
            pool,
            marketplace: marketplace.into(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct VariationRow {
    listing_id: i64,
    variation_sku: Option<String>,
    title: String,
    current_price: Decimal,
}

#[derive(sqlx::FromRow)]
struct MappingRow {
    variation_sku: String,
    internal_sku: String,
    active: bool,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    internal_sku: String,
    name: String,
    weight_grams: Option<Decimal>,
    material_id: Option<i64>,
    postage_cost: Decimal,
}

#[derive(sqlx::FromRow)]
struct MaterialRow {
    material_id: i64,
    name: String,
    cost_per_gram: Option<Decimal>,
    sell_price_per_gram: Option<Decimal>,
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn load_catalogue(&self) -> Result<Catalogue, BoxError> {
        // One transaction so every table is read at the same point in time
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let variations = sqlx::query_as::<_, VariationRow>(
            r#"
            SELECT listing_id, variation_sku, title, current_price
            FROM marketplace_variations
            WHERE marketplace = $1
            ORDER BY listing_id, variation_sku NULLS FIRST
            "#,
        )
        .bind(&self.marketplace)
        .fetch_all(&mut *tx)
        .await?;

        let mappings = sqlx::query_as::<_, MappingRow>(
            "SELECT variation_sku, internal_sku, active FROM sku_mappings WHERE marketplace = $1 ORDER BY id",
        )
        .bind(&self.marketplace)
        .fetch_all(&mut *tx)
        .await?;

        let products = sqlx::query_as::<_, ProductRow>(
            "SELECT internal_sku, name, weight_grams, material_id, postage_cost FROM master_products",
        )
        .fetch_all(&mut *tx)
        .await?;

        let materials = sqlx::query_as::<_, MaterialRow>(
            "SELECT material_id, name, cost_per_gram, sell_price_per_gram FROM materials",
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut catalogue = Catalogue::new(self.marketplace.clone());

        for row in materials {
            catalogue.add_material(Material {
                material_id: row.material_id,
                name: row.name,
                cost_per_gram: row.cost_per_gram,
                sell_price_per_gram: row.sell_price_per_gram,
            });
        }

        for row in products {
            catalogue.add_product(MasterProduct {
                internal_sku: row.internal_sku,
                name: row.name,
                weight_grams: row.weight_grams,
                material_id: row.material_id,
                postage_cost: row.postage_cost,
            });
        }

        for row in mappings {
            catalogue.add_mapping(SkuMapping {
                marketplace: self.marketplace.clone(),
                variation_sku: row.variation_sku,
                internal_sku: row.internal_sku,
                active: row.active,
            })?;
        }

        let count = variations.len();
        for row in variations {
            catalogue.add_variation(Variation::new(row.listing_id, row.variation_sku, row.title, row.current_price));
        }

        debug!("Loaded {} {} variations", count, self.marketplace);
        Ok(catalogue)
    }
}
