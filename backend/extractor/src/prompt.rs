/// Instruction sent with every document.
pub const EXTRACTION_PROMPT: &str = "You are a finance assistant. Extract ONLY these fields from \
the receipt image/PDF: vendor, date, amount, currency. \
Return only a JSON object. If absent, null the field. \
Also return a 'raw_text' field with all text you see.";

/// Reply budget for one extraction.
pub const DEFAULT_MAX_TOKENS: u32 = 400;
