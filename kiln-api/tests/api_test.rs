use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use kiln_api::{app, AppState};
use kiln_catalog::{Catalogue, MasterProduct, Material, SkuMapping, Variation};
use kiln_core::{BoxError, InMemoryCatalogRepository, MarketplaceClient};
use kiln_staging::{InMemoryStagingRepository, PricingWorkflow, WorkflowSettings};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

struct FlakyMarketplace {
    failing: HashSet<String>,
}

#[async_trait]
impl MarketplaceClient for FlakyMarketplace {
    async fn fetch_variation_current_price(&self, _listing_id: i64, _variation_sku: &str) -> Result<Decimal, BoxError> {
        Ok(dec!(18.00))
    }

    async fn update_variation_price(&self, _listing_id: i64, variation_sku: &str, _price: Decimal) -> Result<(), BoxError> {
        if self.failing.contains(variation_sku) {
            return Err("listing is inactive".into());
        }
        Ok(())
    }
}

fn catalogue() -> Catalogue {
    let mut catalogue = Catalogue::new("etsy");
    catalogue.add_material(Material {
        material_id: 1,
        name: "Sterling silver".into(),
        cost_per_gram: Some(dec!(1.70)),
        sell_price_per_gram: None,
    });
    for sku in ["R-001", "R-002"] {
        catalogue.add_product(MasterProduct {
            internal_sku: sku.into(),
            name: sku.into(),
            weight_grams: Some(dec!(5)),
            material_id: Some(1),
            postage_cost: dec!(2.00),
        });
    }
    catalogue.add_variation(Variation::new(100, Some("RING-S".into()), "Band ring, small", dec!(19.99)));
    catalogue.add_variation(Variation::new(100, Some("RING-L".into()), "Band ring, large", dec!(24.99)));
    catalogue.add_variation(Variation::new(300, Some("UNMAPPED".into()), "Old stock", dec!(9.99)));
    catalogue.add_mapping(SkuMapping::active("etsy", "RING-S", "R-001")).unwrap();
    catalogue.add_mapping(SkuMapping::active("etsy", "RING-L", "R-002")).unwrap();
    catalogue
}

fn test_app(failing: &[&str]) -> Router {
    let marketplace = FlakyMarketplace {
        failing: failing.iter().map(|s| s.to_string()).collect(),
    };
    let workflow = PricingWorkflow::new(
        Arc::new(InMemoryCatalogRepository::new(catalogue())),
        Arc::new(InMemoryStagingRepository::new()),
        Arc::new(marketplace),
        WorkflowSettings::default(),
    );
    app(AppState {
        workflow: Arc::new(workflow),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let res = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = test_app(&[]);
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_calculate_and_list() {
    let app = test_app(&[]);

    let (status, report) = send(&app, "POST", "/v1/staging/calculate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["calculated"], 2);
    assert_eq!(report["skipped"], 1);
    assert_eq!(report["skips"][0]["sku"], "UNMAPPED");
    assert_eq!(report["skips"][0]["cause"], "not_mapped");

    let (status, records) = send(&app, "GET", "/v1/staging?status=pending", None).await;
    assert_eq!(status, StatusCode::OK);
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    // Ordered by listing, then SKU
    assert_eq!(records[0]["variation_sku"], "RING-L");
    assert_eq!(records[1]["variation_sku"], "RING-S");
    assert_eq!(records[1]["calculated_price"], "21.00");
    assert_eq!(records[1]["status"], "pending");

    let (_, filtered) = send(&app, "GET", "/v1/staging?q=ring-l", None).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_modifier_validation_and_not_found() {
    let app = test_app(&[]);
    send(&app, "POST", "/v1/staging/calculate", None).await;

    let (status, record) = send(
        &app,
        "PUT",
        "/v1/staging/RING-S/modifier",
        Some(json!({"margin_modifier": "30"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["calculated_price"], "24.04");

    let (status, body) = send(
        &app,
        "PUT",
        "/v1/staging/RING-S/modifier",
        Some(json!({"margin_modifier": "85"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("85"));

    let (status, _) = send(
        &app,
        "PUT",
        "/v1/staging/RING-S/modifier",
        Some(json!({"margin_modifier": "30.125"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        "/v1/staging/GHOST/modifier",
        Some(json!({"margin_modifier": "10"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pushed_record_cannot_be_edited() {
    let app = test_app(&[]);
    send(&app, "POST", "/v1/staging/calculate", None).await;
    send(&app, "POST", "/v1/staging/approve", Some(json!({"skus": ["RING-S"]}))).await;
    send(&app, "POST", "/v1/staging/push", Some(json!({"skus": ["RING-S"]}))).await;

    let (status, _) = send(
        &app,
        "PUT",
        "/v1/staging/RING-S/modifier",
        Some(json!({"margin_modifier": "20"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_approve_and_partial_push() {
    let app = test_app(&["RING-L"]);
    send(&app, "POST", "/v1/staging/calculate", None).await;

    let (status, report) = send(
        &app,
        "POST",
        "/v1/staging/approve",
        Some(json!({"skus": ["RING-S", "RING-L", "GHOST"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["updated_count"], 2);
    assert_eq!(report["skipped"][0]["cause"], "not_staged");

    let (status, report) = send(&app, "POST", "/v1/staging/push", Some(json!({"skus": ["RING-S", "RING-L"]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["pushed_count"], 1);
    assert_eq!(report["failed_count"], 1);
    assert_eq!(report["failures"][0]["sku"], "RING-L");
    assert_eq!(report["failures"][0]["error"], "listing is inactive");

    let (_, stats) = send(&app, "GET", "/v1/staging/stats", None).await;
    assert_eq!(stats["pushed"], 1);
    assert_eq!(stats["approved"], 1);
}

#[tokio::test]
async fn test_bulk_margin_and_empty_selection() {
    let app = test_app(&[]);
    send(&app, "POST", "/v1/staging/calculate", None).await;

    let (status, report) = send(
        &app,
        "POST",
        "/v1/staging/bulk-margin",
        Some(json!({"skus": ["RING-S", "RING-L"], "margin": "30"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["updated_count"], 2);

    let (status, _) = send(
        &app,
        "POST",
        "/v1/staging/bulk-margin",
        Some(json!({"skus": ["RING-S"], "margin": "-5"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/v1/staging/approve", Some(json!({"skus": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No SKUs selected");
}

#[tokio::test]
async fn test_refresh_prices() {
    let app = test_app(&[]);
    send(&app, "POST", "/v1/staging/calculate", None).await;

    let (status, report) = send(&app, "POST", "/v1/staging/refresh-prices", Some(json!({"skus": ["RING-S"]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["refreshed"][0]["current_price"], "18.00");
}
