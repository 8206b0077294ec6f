//! Media handling for uploaded receipts: type detection, the upload
//! acceptance policy, and inline file responses.

pub mod media_server;
pub mod mime_detect;
pub mod upload;

pub use media_server::{content_disposition, inline_file_response};
pub use mime_detect::{
    detect_mime_type, is_image, is_receipt_type, legacy_content_type, sniff_mime,
};
pub use upload::{UploadRejection, classify_upload};
