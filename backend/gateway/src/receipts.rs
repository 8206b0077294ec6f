//! Receipt listing page and file retrieval.

use axum::{
    extract::{Path, State},
    response::{Html, Response},
};
use receiptforge_core::ReceiptError;
use receiptforge_media::{inline_file_response, legacy_content_type};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::pages::render_receipts;
use crate::server::GatewayState;

/// Handler for `GET /receipts`.
pub async fn list_receipts(State(state): State<GatewayState>) -> Result<Html<String>, ApiError> {
    let listing = state.records.list().await?;
    debug!(
        records = listing.records.len(),
        skipped = listing.skipped.len(),
        "Rendering receipts table"
    );
    Ok(Html(render_receipts(&listing.records, listing.skipped.len())))
}

/// Handler for `GET /receipt/:id`.
pub async fn get_receipt_file(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let (record, bytes) = state.records.get(&id).await?.ok_or_else(not_found)?;

    let mime = record
        .mime_type
        .as_deref()
        .unwrap_or_else(|| legacy_content_type(&record.filename));
    Ok(inline_file_response(bytes, mime, &record.filename))
}

/// Ids that are not UUIDs cannot exist, so they are a plain 404.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError(not_found()))
}

pub(crate) fn not_found() -> ReceiptError {
    ReceiptError::NotFound("receipt not found".into())
}
