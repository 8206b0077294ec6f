//! Upload acceptance policy.
//!
//! Zero-byte files are rejected. The stored type comes from the bytes when
//! they are recognised, else from the extension, else from the declared
//! multipart content type; only raster images and PDFs are accepted.

use std::fmt;

use tracing::debug;

use crate::mime_detect::{detect_mime_type, is_receipt_type, sniff_mime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    Empty,
    Unsupported { detected: String },
}

impl fmt::Display for UploadRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "uploaded file is empty"),
            Self::Unsupported { detected } => {
                write!(f, "only images and PDFs are accepted (got {detected})")
            }
        }
    }
}

/// Decide the MIME type to store for an upload, or why it is refused.
pub fn classify_upload(
    filename: &str,
    declared: Option<&str>,
    bytes: &[u8],
) -> Result<String, UploadRejection> {
    if bytes.is_empty() {
        return Err(UploadRejection::Empty);
    }

    let declared = declared
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    let detected = match sniff_mime(bytes) {
        Some(sniffed) => sniffed.to_string(),
        None => match detect_mime_type(filename) {
            "application/octet-stream" => {
                declared.unwrap_or_else(|| "application/octet-stream".to_string())
            }
            by_extension => by_extension.to_string(),
        },
    };
    debug!(filename = %filename, mime = %detected, "Classified upload");

    if is_receipt_type(&detected) {
        Ok(detected)
    } else {
        Err(UploadRejection::Unsupported { detected })
    }
}
