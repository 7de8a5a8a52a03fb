use std::time::Duration;

use async_trait::async_trait;
use kiln_core::{BoxError, MarketplaceClient};
use kiln_shared::Masked;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// REST client for the marketplace's variation pricing endpoints.
///
/// `GET  {base_url}/shops/{shop_id}/listings/{listing_id}/variations/{sku}` returns `{"price": ...}`;
/// `PUT` on the same path with `{"price": ...}` replaces it.
pub struct HttpMarketplaceClient {
    client: Client,
    base_url: String,
    shop_id: i64,
    api_key: Masked<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PriceBody {
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
}

#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("Marketplace rejected {sku} with {status}: {body}")]
    Rejected {
        sku: String,
        status: StatusCode,
        body: String,
    },

    #[error("Marketplace request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl HttpMarketplaceClient {
    pub fn new(base_url: impl Into<String>, shop_id: i64, api_key: Masked<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            shop_id,
            api_key,
        })
    }

    fn variation_url(&self, listing_id: i64, variation_sku: &str) -> String {
        format!(
            "{}/shops/{}/listings/{}/variations/{}",
            self.base_url.trim_end_matches('/'),
            self.shop_id,
            listing_id,
            variation_sku
        )
    }

    async fn check(&self, sku: &str, res: reqwest::Response) -> Result<reqwest::Response, MarketplaceError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        Err(MarketplaceError::Rejected {
            sku: sku.to_string(),
            status,
            body,
        })
    }
}

#[async_trait]
impl MarketplaceClient for HttpMarketplaceClient {
    async fn fetch_variation_current_price(&self, listing_id: i64, variation_sku: &str) -> Result<Decimal, BoxError> {
        let res = self
            .client
            .get(self.variation_url(listing_id, variation_sku))
            .header("x-api-key", self.api_key.expose())
            .send()
            .await
            .map_err(MarketplaceError::from)?;

        let body: PriceBody = self
            .check(variation_sku, res)
            .await?
            .json()
            .await
            .map_err(MarketplaceError::from)?;
        Ok(body.price)
    }

    async fn update_variation_price(&self, listing_id: i64, variation_sku: &str, price: Decimal) -> Result<(), BoxError> {
        debug!("PUT price {} for listing {} sku {}", price, listing_id, variation_sku);

        let res = self
            .client
            .put(self.variation_url(listing_id, variation_sku))
            .header("x-api-key", self.api_key.expose())
            .json(&PriceBody { price })
            .send()
            .await
            .map_err(MarketplaceError::from)?;

        self.check(variation_sku, res).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_variation_url() {
        let client = HttpMarketplaceClient::new("https://api.example.test/v3/", 42, Masked("key".into())).unwrap();
        assert_eq!(
            client.variation_url(100, "RING-S"),
            "https://api.example.test/v3/shops/42/listings/100/variations/RING-S"
        );
    }

    #[test]
    fn test_price_body_is_a_string() {
        let json = serde_json::to_string(&PriceBody { price: dec!(24.04) }).unwrap();
        assert_eq!(json, r#"{"price":"24.04"}"#);

        let parsed: PriceBody = serde_json::from_str(r#"{"price":"19.99"}"#).unwrap();
        assert_eq!(parsed.price, dec!(19.99));
    }
}
