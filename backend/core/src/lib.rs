pub mod error;
pub mod traits;
pub mod types;

pub use error::ReceiptError;
pub use traits::{KvStore, VisionError, VisionProvider, VisionRequest, VisionResponse};
pub use types::{excerpt, ExtractionOutcome, ReceiptFields, ReceiptRecord, EXCERPT_CHARS};
