//! Serves stored receipt files back to the browser.
//!
//! Builds the response for `GET /receipt/{id}`: raw bytes with a content
//! type and an inline disposition carrying the original filename.

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tracing::debug;

/// `inline; filename="…"`, with a `filename*` UTF-8 variant for non-ASCII names.
pub fn content_disposition(filename: &str) -> String {
    let name = if filename.trim().is_empty() { "receipt" } else { filename };
    let ascii: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    if name.is_ascii() && !name.chars().any(|c| c.is_ascii_control()) {
        format!("inline; filename=\"{ascii}\"")
    } else {
        format!("inline; filename=\"{ascii}\"; filename*=UTF-8''{}", percent_encode(name))
    }
}

/// RFC 5987 `attr-char` encoding.
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for b in value.bytes() {
        if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// 200 response carrying the file bytes.
pub fn inline_file_response(bytes: Vec<u8>, mime: &str, filename: &str) -> Response {
    debug!(mime = %mime, size_bytes = bytes.len(), "Serving receipt file");

    let content_type = HeaderValue::from_str(mime)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(filename))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));
    let length = HeaderValue::from(bytes.len());

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(header::CONTENT_LENGTH, length);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("private, max-age=86400"));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}
