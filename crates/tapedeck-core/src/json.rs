//! JSON helpers shared by matching and sanitization

use serde_json::Value;

/// Whether a content type denotes a JSON body
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains("application/json")
}

/// Re-render a JSON document with two-space indentation
///
/// Returns `None` when `raw` is not valid JSON. Object keys come out sorted,
/// HTML-significant characters are not escaped.
pub fn pretty_print(raw: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(raw).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

/// Render a JSON document without insignificant whitespace
pub fn compact(raw: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(raw).ok()?;
    serde_json::to_string(&value).ok()
}

/// Compare two bodies as JSON documents, falling back to byte equality
///
/// Formatting and key order are ignored when both sides parse.
pub fn semantically_equal(a: &[u8], b: &[u8]) -> bool {
    match (
        serde_json::from_slice::<Value>(a),
        serde_json::from_slice::<Value>(b),
    ) {
        (Ok(va), Ok(vb)) => va == vb,
        _ => a == b,
    }
}
