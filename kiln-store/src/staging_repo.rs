use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kiln_catalog::{CostInputs, FeeBreakdown, ProfitSummary};
use kiln_core::BoxError;
use kiln_staging::{Lifecycle, StagingFilter, StagingKey, StagingRecord, StagingRepository, StagingSnapshot, StagingStatus};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

const COLUMNS: &str = "listing_id, variation_sku, current_price, material_cost, weight_grams, postage_cost, \
    margin_modifier, base_calculated_price, calculated_price, transaction_fee, payment_fee, ad_fee, total_fees, \
    profit_no_ads, profit_with_ads, margin_no_ads, margin_with_ads, status, approved_at, pushed_at, \
    calculated_at, last_push_error";

pub struct PgStagingRepository {
    pool: PgPool,
}

impl PgStagingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct StagingRow {
    listing_id: i64,
    variation_sku: String,
    current_price: Decimal,
    material_cost: Decimal,
    weight_grams: Decimal,
    postage_cost: Decimal,
    margin_modifier: Decimal,
    base_calculated_price: Decimal,
    calculated_price: Decimal,
    transaction_fee: Decimal,
    payment_fee: Decimal,
    ad_fee: Decimal,
    total_fees: Decimal,
    profit_no_ads: Decimal,
    profit_with_ads: Decimal,
    margin_no_ads: Decimal,
    margin_with_ads: Decimal,
    status: String,
    approved_at: Option<DateTime<Utc>>,
    pushed_at: Option<DateTime<Utc>>,
    calculated_at: DateTime<Utc>,
    last_push_error: Option<String>,
}

impl StagingRow {
    fn into_record(self) -> Result<StagingRecord, BoxError> {
        let status = StagingStatus::from_str(&self.status)?;
        let lifecycle = Lifecycle::from_parts(status, self.approved_at, self.pushed_at)
            .map_err(|e| format!("{}: {}", self.variation_sku, e))?;

        Ok(StagingRecord::from(StagingSnapshot {
            key: StagingKey::new(self.listing_id, self.variation_sku),
            current_price: self.current_price,
            costs: CostInputs {
                material_cost: self.material_cost,
                weight_grams: self.weight_grams,
                postage_cost: self.postage_cost,
            },
            margin_modifier: self.margin_modifier,
            base_calculated_price: self.base_calculated_price,
            calculated_price: self.calculated_price,
            fees: FeeBreakdown {
                transaction_fee: self.transaction_fee,
                payment_fee: self.payment_fee,
                ad_fee: self.ad_fee,
                total_fees: self.total_fees,
            },
            profit: ProfitSummary {
                profit_no_ads: self.profit_no_ads,
                profit_with_ads: self.profit_with_ads,
                margin_no_ads: self.margin_no_ads,
                margin_with_ads: self.margin_with_ads,
            },
            lifecycle,
            calculated_at: self.calculated_at,
            last_push_error: self.last_push_error,
        }))
    }
}

#[async_trait]
impl StagingRepository for PgStagingRepository {
    async fn get(&self, variation_sku: &str) -> Result<Option<StagingRecord>, BoxError> {
        let row = sqlx::query_as::<_, StagingRow>(&format!(
            "SELECT {} FROM price_staging WHERE variation_sku = $1",
            COLUMNS
        ))
        .bind(variation_sku)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StagingRow::into_record).transpose()
    }

    async fn upsert(&self, record: &StagingRecord) -> Result<(), BoxError> {
        let s = record.snapshot();

        sqlx::query(
            r#"
            INSERT INTO price_staging (
                listing_id, variation_sku, current_price, material_cost, weight_grams, postage_cost,
                margin_modifier, base_calculated_price, calculated_price,
                transaction_fee, payment_fee, ad_fee, total_fees,
                profit_no_ads, profit_with_ads, margin_no_ads, margin_with_ads,
                status, approved_at, pushed_at, calculated_at, last_push_error
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            ON CONFLICT (listing_id, variation_sku) DO UPDATE SET
                current_price = EXCLUDED.current_price,
                material_cost = EXCLUDED.material_cost,
                weight_grams = EXCLUDED.weight_grams,
                postage_cost = EXCLUDED.postage_cost,
                margin_modifier = EXCLUDED.margin_modifier,
                base_calculated_price = EXCLUDED.base_calculated_price,
                calculated_price = EXCLUDED.calculated_price,
                transaction_fee = EXCLUDED.transaction_fee,
                payment_fee = EXCLUDED.payment_fee,
                ad_fee = EXCLUDED.ad_fee,
                total_fees = EXCLUDED.total_fees,
                profit_no_ads = EXCLUDED.profit_no_ads,
                profit_with_ads = EXCLUDED.profit_with_ads,
                margin_no_ads = EXCLUDED.margin_no_ads,
                margin_with_ads = EXCLUDED.margin_with_ads,
                status = EXCLUDED.status,
                approved_at = EXCLUDED.approved_at,
                pushed_at = EXCLUDED.pushed_at,
                calculated_at = EXCLUDED.calculated_at,
                last_push_error = EXCLUDED.last_push_error
            "#,
        )
        .bind(s.key.listing_id)
        .bind(&s.key.variation_sku)
        .bind(s.current_price)
        .bind(s.costs.material_cost)
        .bind(s.costs.weight_grams)
        .bind(s.costs.postage_cost)
        .bind(s.margin_modifier)
        .bind(s.base_calculated_price)
        .bind(s.calculated_price)
        .bind(s.fees.transaction_fee)
        .bind(s.fees.payment_fee)
        .bind(s.fees.ad_fee)
        .bind(s.fees.total_fees)
        .bind(s.profit.profit_no_ads)
        .bind(s.profit.profit_with_ads)
        .bind(s.profit.margin_no_ads)
        .bind(s.profit.margin_with_ads)
        .bind(s.lifecycle.status().as_str())
        .bind(s.lifecycle.approved_at())
        .bind(s.lifecycle.pushed_at())
        .bind(s.calculated_at)
        .bind(&s.last_push_error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, filter: &StagingFilter) -> Result<Vec<StagingRecord>, BoxError> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM price_staging WHERE TRUE", COLUMNS));

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(listing_id) = filter.listing_id {
            query.push(" AND listing_id = ").push_bind(listing_id);
        }
        if let Some(needle) = &filter.sku_contains {
            query
                .push(" AND variation_sku ILIKE ")
                .push_bind(format!("%{}%", escape_like(needle)));
        }
        query.push(" ORDER BY listing_id, variation_sku");

        let rows = query.build_query_as::<StagingRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(StagingRow::into_record).collect()
    }
}

fn escape_like(value: &str) -> String {
    value.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(status: &str, approved_at: Option<DateTime<Utc>>) -> StagingRow {
        StagingRow {
            listing_id: 100,
            variation_sku: "RING-S".into(),
            current_price: dec!(19.99),
            material_cost: dec!(8.50),
            weight_grams: dec!(5),
            postage_cost: dec!(2.00),
            margin_modifier: dec!(30),
            base_calculated_price: dec!(21.00),
            calculated_price: dec!(24.04),
            transaction_fee: dec!(1.56),
            payment_fee: dec!(1.16),
            ad_fee: dec!(3.61),
            total_fees: dec!(6.33),
            profit_no_ads: dec!(10.82),
            profit_with_ads: dec!(7.21),
            margin_no_ads: dec!(45.01),
            margin_with_ads: dec!(29.99),
            status: status.into(),
            approved_at,
            pushed_at: None,
            calculated_at: Utc::now(),
            last_push_error: None,
        }
    }

    #[test]
    fn test_row_decodes_into_record() {
        let at = Utc::now();
        let record = row("approved", Some(at)).into_record().unwrap();

        assert_eq!(record.sku(), "RING-S");
        assert_eq!(record.status(), StagingStatus::Approved);
        assert_eq!(record.lifecycle().approved_at(), Some(at));
        assert_eq!(record.calculated_price(), dec!(24.04));
        assert_eq!(record.fees().total_fees, dec!(6.33));
    }

    #[test]
    fn test_row_with_inconsistent_lifecycle_is_rejected() {
        assert!(row("approved", None).into_record().is_err());
        assert!(row("archived", None).into_record().is_err());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }
}
