//! Tool-call argument normalization shared by every adapter (`spec.md`
//! §4.8: "Tool-call arguments may arrive as JSON string or object; adapters
//! normalize").

use serde_json::Value;

/// Normalize a tool call's raw arguments to a JSON object.
///
/// Providers that return arguments as a JSON-encoded string (the OpenAI
/// Chat Completions wire format) are parsed; providers that already return
/// a JSON object pass through unchanged. A string that fails to parse as
/// JSON, or any other non-object value, normalizes to an empty object
/// rather than erroring — a malformed tool call should fail at the tool
/// layer with a clear validation error, not be swallowed here.
#[must_use]
pub fn normalize_tool_arguments(raw: &Value) -> Value {
    match raw {
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .filter(Value::is_object)
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        Value::Object(_) => raw.clone(),
        _ => Value::Object(serde_json::Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_string_arguments() {
        let raw = json!("{\"path\": \"a.txt\"}");
        assert_eq!(normalize_tool_arguments(&raw), json!({"path": "a.txt"}));
    }

    #[test]
    fn passes_through_object_arguments() {
        let raw = json!({"path": "a.txt"});
        assert_eq!(normalize_tool_arguments(&raw), raw);
    }

    #[test]
    fn falls_back_to_empty_object_for_malformed_string() {
        let raw = json!("not json");
        assert_eq!(normalize_tool_arguments(&raw), json!({}));
    }

    #[test]
    fn falls_back_to_empty_object_for_non_object_json() {
        let raw = json!("[1,2,3]");
        assert_eq!(normalize_tool_arguments(&raw), json!({}));
    }
}
