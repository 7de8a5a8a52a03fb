use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use kiln_staging::{
    BatchReport, CalculationReport, PushReport, RefreshReport, StagingFilter, StagingRecord, StagingStats,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SkuSelection {
    pub skus: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecalculateRequest {
    pub skus: Vec<String>,
    /// Also start a new cycle for records already pushed.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct BulkMarginRequest {
    pub skus: Vec<String>,
    pub margin: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ModifierRequest {
    pub margin_modifier: Decimal,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/staging", get(list_staging))
        .route("/v1/staging/stats", get(staging_stats))
        .route("/v1/staging/calculate", post(calculate_all))
        .route("/v1/staging/recalculate", post(recalculate))
        .route("/v1/staging/bulk-margin", post(apply_bulk_margin))
        .route("/v1/staging/approve", post(approve))
        .route("/v1/staging/reject", post(reject))
        .route("/v1/staging/push", post(push))
        .route("/v1/staging/refresh-prices", post(refresh_prices))
        .route("/v1/staging/{sku}/modifier", put(update_modifier))
}

fn require_skus(skus: &[String]) -> Result<(), AppError> {
    if skus.is_empty() {
        return Err(AppError::Validation("No SKUs selected".to_string()));
    }
    Ok(())
}

/// GET /v1/staging?status=&listing_id=&q=
pub async fn list_staging(
    State(state): State<AppState>,
    Query(filter): Query<StagingFilter>,
) -> Result<Json<Vec<StagingRecord>>, AppError> {
    Ok(Json(state.workflow.list(&filter).await?))
}

/// GET /v1/staging/stats
pub async fn staging_stats(State(state): State<AppState>) -> Result<Json<StagingStats>, AppError> {
    Ok(Json(state.workflow.stats().await?))
}

/// POST /v1/staging/calculate
pub async fn calculate_all(State(state): State<AppState>) -> Result<Json<CalculationReport>, AppError> {
    Ok(Json(state.workflow.calculate_all().await?))
}

/// POST /v1/staging/recalculate
pub async fn recalculate(
    State(state): State<AppState>,
    Json(req): Json<RecalculateRequest>,
) -> Result<Json<CalculationReport>, AppError> {
    require_skus(&req.skus)?;
    Ok(Json(state.workflow.recalculate(&req.skus, req.force).await?))
}

/// PUT /v1/staging/{sku}/modifier
pub async fn update_modifier(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Json(req): Json<ModifierRequest>,
) -> Result<Json<StagingRecord>, AppError> {
    let record = state.workflow.update_modifier(&sku, req.margin_modifier).await?;
    Ok(Json(record))
}

/// POST /v1/staging/bulk-margin
pub async fn apply_bulk_margin(
    State(state): State<AppState>,
    Json(req): Json<BulkMarginRequest>,
) -> Result<Json<BatchReport>, AppError> {
    require_skus(&req.skus)?;
    Ok(Json(state.workflow.apply_bulk_margin(&req.skus, req.margin).await?))
}

/// POST /v1/staging/approve
pub async fn approve(
    State(state): State<AppState>,
    Json(req): Json<SkuSelection>,
) -> Result<Json<BatchReport>, AppError> {
    require_skus(&req.skus)?;
    Ok(Json(state.workflow.approve(&req.skus).await?))
}

/// POST /v1/staging/reject
pub async fn reject(
    State(state): State<AppState>,
    Json(req): Json<SkuSelection>,
) -> Result<Json<BatchReport>, AppError> {
    require_skus(&req.skus)?;
    Ok(Json(state.workflow.reject(&req.skus).await?))
}

/// POST /v1/staging/push
///
/// Per-SKU marketplace failures are part of the 200 response, not an error.
pub async fn push(
    State(state): State<AppState>,
    Json(req): Json<SkuSelection>,
) -> Result<Json<PushReport>, AppError> {
    require_skus(&req.skus)?;
    Ok(Json(state.workflow.push_selected(&req.skus).await?))
}

/// POST /v1/staging/refresh-prices
pub async fn refresh_prices(
    State(state): State<AppState>,
    Json(req): Json<SkuSelection>,
) -> Result<Json<RefreshReport>, AppError> {
    require_skus(&req.skus)?;
    Ok(Json(state.workflow.refresh_current_prices(&req.skus).await?))
}
