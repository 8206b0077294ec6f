//! Field Extractor: turns receipt bytes into vendor/date/amount/currency/raw_text
//! by asking a vision model and scanning its reply for a JSON object.

pub mod extractor;
pub mod json_scan;
pub mod prompt;
pub mod providers;
pub mod retry;

pub use extractor::{Extraction, ExtractorConfig, FieldExtractor};
pub use json_scan::{find_first_object, parse_reply};
pub use providers::{build_provider, ProviderKind, ProviderSettings};
pub use retry::RetryPolicy;
