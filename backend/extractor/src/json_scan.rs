//! Reply parsing: find the JSON object a model wrapped in prose or a fenced block.
//!
//! A depth-counting scanner, string- and escape-aware, so braces inside JSON
//! strings do not end an object early.

use receiptforge_core::{ExtractionOutcome, ReceiptFields};
use serde_json::{Map, Value};

use crate::extractor::Extraction;

/// End offset (exclusive) of the balanced object opening at `start`, if it closes.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Top-level balanced `{...}` slices of `text`, left to right.
///
/// A `{` that never closes is skipped and scanning resumes right after it.
fn object_candidates(text: &str) -> impl Iterator<Item = &str> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    std::iter::from_fn(move || {
        while pos < bytes.len() {
            let start = pos + bytes[pos..].iter().position(|&b| b == b'{')?;
            match balanced_end(bytes, start) {
                Some(end) => {
                    pos = end;
                    // `{` and `}` are ASCII, so both offsets are char boundaries.
                    return Some(&text[start..end]);
                }
                None => pos = start + 1,
            }
        }
        None
    })
}

/// The first top-level balanced object in `text` that parses as a JSON object.
pub fn find_first_object(text: &str) -> Option<Map<String, Value>> {
    object_candidates(text).find_map(|candidate| match serde_json::from_str(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    })
}

/// Turn a model reply into fields.
///
/// Without a parseable object the whole reply becomes `raw_text` and the
/// structured fields stay empty.
pub fn parse_reply(reply: &str) -> Extraction {
    match find_first_object(reply) {
        Some(object) => Extraction {
            fields: ReceiptFields::from_json_object(&object),
            outcome: ExtractionOutcome::Structured,
        },
        None => Extraction {
            fields: ReceiptFields::raw_text_only(reply),
            outcome: ExtractionOutcome::RawTextOnly,
        },
    }
}
