//! Receipt upload endpoint.
//!
//! `POST /upload` takes the multipart field `receipt`, runs field extraction,
//! stores the record and redirects to the listing.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use receiptforge_core::{ExtractionOutcome, ReceiptError, ReceiptRecord};
use receiptforge_extractor::Extraction;
use receiptforge_logging::{ReceiptEvent, ReceiptEventLogger};
use receiptforge_media::{classify_upload, UploadRejection};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Multipart field carrying the file.
pub const RECEIPT_FIELD: &str = "receipt";

/// The file part of an upload form.
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Handler for `POST /upload`.
pub async fn upload_receipt(State(state): State<GatewayState>, multipart: Multipart) -> Response {
    let file = match read_receipt_field(multipart).await {
        Ok(file) => file,
        Err(e) => {
            warn!(error = %e, "Failed to read upload body");
            return e.into_response();
        }
    };

    match store_upload(&state, file).await {
        Ok(redirect) => redirect.into_response(),
        Err(e) => e.into_response(),
    }
}

/// First `receipt` part of the form. Other fields are ignored.
async fn read_receipt_field(
    mut multipart: Multipart,
) -> Result<Option<UploadedFile>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(RECEIPT_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?.to_vec();
        return Ok(Some(UploadedFile {
            filename,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}

async fn store_upload(
    state: &GatewayState,
    file: Option<UploadedFile>,
) -> Result<Redirect, ApiError> {
    // A browser submits an unnamed empty part when no file was chosen.
    let file = match file {
        Some(f) if !(f.filename.is_empty() && f.bytes.is_empty()) => f,
        _ => return Err(reject(ReceiptError::BadRequest("no receipt file provided".into()))),
    };

    let mime = classify_upload(&file.filename, file.content_type.as_deref(), &file.bytes)
        .map_err(|rejection| {
            reject(match rejection {
                UploadRejection::Empty => ReceiptError::BadRequest(rejection.to_string()),
                UploadRejection::Unsupported { .. } => {
                    ReceiptError::UnsupportedMedia(rejection.to_string())
                }
            })
        })?;

    info!(
        filename = %file.filename,
        mime = %mime,
        size_bytes = file.bytes.len(),
        "Receipt upload received"
    );

    let extraction = match state
        .extractor
        .extract(&file.bytes, &mime, &file.filename)
        .await
    {
        Ok(extraction) => extraction,
        Err(e) => Extraction::failed(e.to_string()),
    };

    let record = ReceiptRecord::new(
        extraction.fields,
        file.filename,
        Some(mime),
        extraction.outcome,
    );

    let degraded = match &record.extraction {
        ExtractionOutcome::Structured => None,
        ExtractionOutcome::RawTextOnly => Some("reply contained no JSON object".to_string()),
        ExtractionOutcome::Failed { reason } => Some(reason.clone()),
    };
    if let Some(reason) = degraded {
        ReceiptEventLogger::log_event(ReceiptEvent::ExtractionDegraded {
            receipt_id: record.id.to_string(),
            reason,
        });
    }

    state.records.put(&record, Some(&file.bytes)).await?;

    ReceiptEventLogger::log_event(ReceiptEvent::ReceiptStored {
        receipt_id: record.id.to_string(),
        filename: record.filename.clone(),
        size_bytes: file.bytes.len(),
        extraction: record.extraction.to_string(),
    });

    Ok(Redirect::to("/receipts"))
}

fn reject(err: ReceiptError) -> ApiError {
    ReceiptEventLogger::log_event(ReceiptEvent::UploadRejected {
        reason: err.to_string(),
    });
    ApiError(err)
}
