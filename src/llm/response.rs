use crate::llm::models::SqlResponse;
use crate::llm::LlmError;
use once_cell::sync::Lazy;
use regex::Regex;

// Only a fence tagged `json` is recognized; other fences are left in place.
static JSON_FENCE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```json(.*?)```").unwrap());

/// Returns the body of the first ```json fence, trimmed, or the input unchanged.
pub fn strip_markdown_json(text: &str) -> &str {
    match JSON_FENCE_REGEX.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text,
    }
}

/// Turns a raw completion into a [`SqlResponse`].
pub fn unwrap_reply(raw: &str) -> Result<SqlResponse, LlmError> {
    let raw = raw.trim();
    let clean = strip_markdown_json(raw);

    serde_json::from_str(clean).map_err(|e| LlmError::FormatError {
        reason: e.to_string(),
        raw: raw.to_string(),
    })
}
