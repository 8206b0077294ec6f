use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Number of characters of raw text kept in a listing excerpt.
pub const EXCERPT_CHARS: usize = 50;

/// Fields pulled out of a receipt by the inference service.
///
/// Every value is text or absent; the model's output is not trusted to carry
/// any stronger typing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptFields {
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub raw_text: Option<String>,
}

impl ReceiptFields {
    /// Map a JSON object from a model reply onto the known fields.
    ///
    /// Numbers and booleans keep their textual form, nested values are kept as
    /// compact JSON, `null` and missing keys become `None`. Unknown keys are dropped.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let text = |key: &str| object.get(key).and_then(value_to_text);
        Self {
            vendor: text("vendor"),
            date: text("date"),
            amount: text("amount"),
            currency: text("currency"),
            raw_text: text("raw_text"),
        }
    }

    /// Only the full reply text, nothing structured.
    pub fn raw_text_only(text: impl Into<String>) -> Self {
        Self {
            raw_text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// How the fields of a record were obtained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// The reply contained a JSON object.
    #[default]
    Structured,
    /// The reply had no parseable JSON object; only raw text was kept.
    RawTextOnly,
    /// The inference call failed; the record carries no fields.
    Failed { reason: String },
}

impl std::fmt::Display for ExtractionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured => write!(f, "structured"),
            Self::RawTextOnly => write!(f, "raw_text_only"),
            Self::Failed { .. } => write!(f, "failed"),
        }
    }
}

/// Stored metadata for one uploaded receipt. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub id: Uuid,
    #[serde(default)]
    pub fields: ReceiptFields,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub extraction: ExtractionOutcome,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl ReceiptRecord {
    /// Create a record with a fresh id and the current timestamp.
    pub fn new(
        fields: ReceiptFields,
        filename: impl Into<String>,
        mime_type: Option<String>,
        extraction: ExtractionOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            fields,
            filename: filename.into(),
            mime_type,
            extraction,
            created_at: Utc::now(),
        }
    }

    /// Listing preview of the raw text.
    pub fn excerpt(&self) -> String {
        self.fields
            .raw_text
            .as_deref()
            .map(excerpt)
            .unwrap_or_default()
    }

    /// Whether a file payload was stored with the record.
    ///
    /// Every upload records its sniffed MIME type, so that marks a stored
    /// file even when the browser sent no filename. Records written without
    /// a MIME type carry a file only if they have a filename.
    pub fn has_file(&self) -> bool {
        self.mime_type.is_some() || !self.filename.is_empty()
    }
}

/// First [`EXCERPT_CHARS`] characters followed by `...`, or the text unchanged
/// when it is not longer than that.
pub fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
