use std::str::FromStr;
use std::time::Duration;

use kiln_catalog::MaterialCostBasis;
use kiln_staging::{ApprovedRecalculation, WorkflowSettings};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::{info, warn};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Layer the `pricing_settings` table over file/env configuration.
    pub async fn fetch_pricing_settings(&self, defaults: WorkflowSettings) -> Result<WorkflowSettings, sqlx::Error> {
        #[derive(sqlx::FromRow)]
        struct SettingRow {
            setting_key: String,
            setting_value: Value,
        }

        let rows = sqlx::query_as::<_, SettingRow>("SELECT setting_key, setting_value FROM pricing_settings")
            .fetch_all(&self.pool)
            .await?;

        let mut settings = defaults;
        for row in rows {
            if !apply_pricing_setting(&mut settings, &row.setting_key, &row.setting_value) {
                warn!("Ignoring pricing setting {} = {}", row.setting_key, row.setting_value);
            }
        }

        Ok(settings)
    }
}

/// Apply one stored override. Expected shape: `{"value": <number or string>}`.
///
/// Returns false for unknown keys and values that do not parse.
pub fn apply_pricing_setting(settings: &mut WorkflowSettings, key: &str, raw: &Value) -> bool {
    let Some(v) = raw.get("value") else {
        return false;
    };

    let fees = &mut settings.pricing.fees;
    let baseline = &mut settings.pricing.baseline;

    match key {
        "transaction_rate" => set_decimal(&mut fees.transaction_rate, v),
        "payment_rate" => set_decimal(&mut fees.payment_rate, v),
        "payment_fixed_fee" => set_decimal(&mut fees.payment_fixed_fee, v),
        "ad_rate" => set_decimal(&mut fees.ad_rate, v),
        "markup_multiplier" => set_decimal(&mut baseline.markup_multiplier, v),
        "minimum_price" => {
            if v.is_null() {
                baseline.minimum_price = None;
                return true;
            }
            match as_decimal(v) {
                Some(d) => {
                    baseline.minimum_price = Some(d);
                    true
                }
                None => false,
            }
        }
        "material_cost_basis" => match v.as_str() {
            Some("cost") => {
                settings.material_cost_basis = MaterialCostBasis::Cost;
                true
            }
            Some("sell") => {
                settings.material_cost_basis = MaterialCostBasis::Sell;
                true
            }
            _ => false,
        },
        "approved_recalculation" => match v.as_str() {
            Some("recalculate") => {
                settings.approved_recalculation = ApprovedRecalculation::Recalculate;
                true
            }
            Some("preserve") => {
                settings.approved_recalculation = ApprovedRecalculation::Preserve;
                true
            }
            _ => false,
        },
        _ => false,
    }
}

fn set_decimal(target: &mut Decimal, v: &Value) -> bool {
    match as_decimal(v) {
        Some(d) => {
            *target = d;
            true
        }
        None => false,
    }
}

// Numbers go through their text form so 0.065 stays exact.
fn as_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_apply_overrides() {
        let mut settings = WorkflowSettings::default();

        assert!(apply_pricing_setting(&mut settings, "ad_rate", &json!({"value": "0.12"})));
        assert!(apply_pricing_setting(&mut settings, "transaction_rate", &json!({"value": 0.07})));
        assert!(apply_pricing_setting(&mut settings, "minimum_price", &json!({"value": "9.99"})));
        assert!(apply_pricing_setting(&mut settings, "approved_recalculation", &json!({"value": "preserve"})));

        assert_eq!(settings.pricing.fees.ad_rate, dec!(0.12));
        assert_eq!(settings.pricing.fees.transaction_rate, dec!(0.07));
        assert_eq!(settings.pricing.baseline.minimum_price, Some(dec!(9.99)));
        assert_eq!(settings.approved_recalculation, ApprovedRecalculation::Preserve);
    }

    #[test]
    fn test_rejects_unknown_and_malformed() {
        let mut settings = WorkflowSettings::default();

        assert!(!apply_pricing_setting(&mut settings, "tax_rate", &json!({"value": "0.2"})));
        assert!(!apply_pricing_setting(&mut settings, "ad_rate", &json!({"value": "lots"})));
        assert!(!apply_pricing_setting(&mut settings, "ad_rate", &json!("0.2")));
        assert!(!apply_pricing_setting(&mut settings, "material_cost_basis", &json!({"value": "retail"})));

        assert_eq!(settings.pricing.fees.ad_rate, dec!(0.15));
    }
}
