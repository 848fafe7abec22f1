//! Scrubbing secret-shaped fields before they reach logs or error payloads
//! (`spec.md` §4.2 "redacted by pattern `(authorization|api_key|token|secret)`").

use serde_json::Value;

const SENSITIVE_KEY_FRAGMENTS: &[&str] = &["authorization", "api_key", "token", "secret"];

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| lower.contains(fragment))
}

/// Replace the value of any object key matching a sensitive-field pattern
/// with `"[REDACTED]"`, recursing into arrays and nested objects.
pub fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *v = Value::String("[REDACTED]".to_string());
                } else {
                    redact_value(v);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_value(item);
            }
        }
        _ => {}
    }
}

/// Redact a JSON value in place and return it, for use in a chained
/// expression.
#[must_use]
pub fn redacted(mut value: Value) -> Value {
    redact_value(&mut value);
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_top_level_sensitive_keys() {
        let mut v = json!({
            "api_key": "sk-123",
            "authorization": "Bearer xyz",
            "other": "fine",
        });
        redact_value(&mut v);
        assert_eq!(v["api_key"], "[REDACTED]");
        assert_eq!(v["authorization"], "[REDACTED]");
        assert_eq!(v["other"], "fine");
    }

    #[test]
    fn redacts_nested_and_array_values() {
        let mut v = json!({
            "providers": [
                {"access_token": "at1", "account_label": "a@example.com"},
                {"access_token": "at2", "account_label": "b@example.com"},
            ]
        });
        redact_value(&mut v);
        assert_eq!(v["providers"][0]["access_token"], "[REDACTED]");
        assert_eq!(v["providers"][1]["access_token"], "[REDACTED]");
        assert_eq!(v["providers"][0]["account_label"], "a@example.com");
    }

    #[test]
    fn is_case_insensitive() {
        let mut v = json!({"API_KEY": "sk-123"});
        redact_value(&mut v);
        assert_eq!(v["API_KEY"], "[REDACTED]");
    }

    #[test]
    fn leaves_non_sensitive_scalar_untouched() {
        let v = redacted(json!("plain string"));
        assert_eq!(v, json!("plain string"));
    }
}
