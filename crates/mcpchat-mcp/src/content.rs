//! Flattening of tool-call content into the string the model sees.

/// Normalize the `content` member of a `tools/call` result to a string.
///
/// Strings pass through unchanged. Arrays and objects become their compact
/// JSON serialization. Anything else (null, numbers, booleans) becomes the
/// empty string. The mapping is lossy: the model only ever sees text.
pub fn normalize_content(content: &serde_json::Value) -> String {
    match content {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => content.to_string(),
        _ => String::new(),
    }
}
