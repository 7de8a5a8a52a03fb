use kiln_shared::Masked;
use kiln_staging::WorkflowSettings;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub marketplace: MarketplaceConfig,
    #[serde(default)]
    pub pricing: WorkflowSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct MarketplaceConfig {
    /// Marketplace whose catalogue is priced, e.g. "etsy".
    pub name: String,
    pub base_url: String,
    pub shop_id: i64,
    pub api_key: Masked<String>,
    /// Log pushes instead of sending them.
    #[serde(default)]
    pub dry_run: bool,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `KILN__MARKETPLACE__API_KEY=...` sets `marketplace.api_key`
            .add_source(config::Environment::with_prefix("KILN").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_staging::ApprovedRecalculation;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"
        [server]
        port = 8080

        [database]
        url = "postgres://localhost/kiln"

        [marketplace]
        name = "etsy"
        base_url = "https://example.test"
        shop_id = 42
        api_key = "secret-key"

        [pricing]
        approved_recalculation = "preserve"

        [pricing.fees]
        ad_rate = "0.12"
    "#;

    #[test]
    fn test_deserialize_sample() {
        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(SAMPLE, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.database.max_connections, 5);
        assert!(!cfg.marketplace.dry_run);
        assert_eq!(cfg.pricing.approved_recalculation, ApprovedRecalculation::Preserve);
        assert_eq!(cfg.pricing.pricing.fees.ad_rate, dec!(0.12));
        // Unset rates keep their defaults
        assert_eq!(cfg.pricing.pricing.fees.transaction_rate, dec!(0.065));
        assert_eq!(cfg.pricing.pricing.baseline.markup_multiplier, dec!(2.0));
        assert!(!format!("{:?}", cfg).contains("secret-key"));
    }
}
