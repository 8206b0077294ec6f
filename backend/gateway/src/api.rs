//! JSON API: health and record metadata.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use receiptforge_core::ReceiptRecord;
use receiptforge_store::SkippedEntry;
use serde::Serialize;

use crate::error::ApiError;
use crate::receipts::{not_found, parse_id};
use crate::server::GatewayState;

#[derive(Serialize)]
pub struct HealthReport {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: String,
    pub provider: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ReceiptList {
    pub receipts: Vec<ReceiptRecord>,
    pub skipped: Vec<SkippedEntry>,
}

/// Handler for `GET /api/health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok".into(),
        service: "receiptforge".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        store: state.records.backend().to_string(),
        provider: state.extractor.provider_name().to_string(),
        timestamp: Utc::now(),
    })
}

/// Handler for `GET /api/receipts`
pub async fn list_receipts(State(state): State<GatewayState>) -> Result<Json<ReceiptList>, ApiError> {
    let listing = state.records.list().await?;
    Ok(Json(ReceiptList {
        receipts: listing.records,
        skipped: listing.skipped,
    }))
}

/// Handler for `GET /api/receipts/:id`
pub async fn get_receipt(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<ReceiptRecord>, ApiError> {
    let id = parse_id(&id)?;
    let record = state.records.get_record(&id).await?.ok_or_else(not_found)?;
    Ok(Json(record))
}
