use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use kiln_api::{app, AppState, HttpMarketplaceClient};
use kiln_core::{DryRunMarketplaceClient, MarketplaceClient};
use kiln_staging::PricingWorkflow;
use kiln_store::{Config, DbClient, PgCatalogRepository, PgStagingRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kiln_api=debug,kiln_staging=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Kiln pricing API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let settings = db
        .fetch_pricing_settings(config.pricing.clone())
        .await
        .context("Failed to load pricing settings")?;
    tracing::info!(
        "Pricing: fee multiplier {}, markup x{}, approved records on recalculation: {:?}",
        settings.pricing.fees.fee_multiplier(),
        settings.pricing.baseline.markup_multiplier,
        settings.approved_recalculation
    );

    let marketplace: Arc<dyn MarketplaceClient> = if config.marketplace.dry_run {
        tracing::warn!("Marketplace dry run enabled: pushes are logged, not sent");
        Arc::new(DryRunMarketplaceClient)
    } else {
        Arc::new(
            HttpMarketplaceClient::new(
                config.marketplace.base_url.clone(),
                config.marketplace.shop_id,
                config.marketplace.api_key.clone(),
            )
            .context("Failed to build marketplace client")?,
        )
    };

    let workflow = PricingWorkflow::new(
        Arc::new(PgCatalogRepository::new(db.pool.clone(), config.marketplace.name.clone())),
        Arc::new(PgStagingRepository::new(db.pool.clone())),
        marketplace,
        settings,
    );

    let app = app(AppState {
        workflow: Arc::new(workflow),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
