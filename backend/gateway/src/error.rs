//! Maps `ReceiptError` onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use receiptforge_core::ReceiptError;
use tracing::error;

/// Handler error: a `ReceiptError` rendered as a plain-text response.
#[derive(Debug)]
pub struct ApiError(pub ReceiptError);

impl From<ReceiptError> for ApiError {
    fn from(err: ReceiptError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ReceiptError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ReceiptError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ReceiptError::NotFound(_) => StatusCode::NOT_FOUND,
            ReceiptError::ExtractionFailed(_) => StatusCode::BAD_GATEWAY,
            ReceiptError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ReceiptError::StoreCorruption { .. } | ReceiptError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "Request failed");
            // Backend details stay in the log.
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            match self.0 {
                ReceiptError::BadRequest(msg)
                | ReceiptError::UnsupportedMedia(msg)
                | ReceiptError::NotFound(msg) => msg,
                other => other.to_string(),
            }
        };
        (status, body).into_response()
    }
}
