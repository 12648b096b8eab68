//! Credential redaction for schema documents
//!
//! Catalog entries in a schema document may embed JDBC URIs, usernames and
//! passwords. Anything leaving the process (prompts, CLI output) goes through
//! [`redact_for_external_use`] first.

use serde_json::{Map, Value};

/// Replacement value for redacted keys
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

/// Keys whose values are replaced, compared case-insensitively
const CREDENTIAL_KEYS: [&str; 8] = [
    "password",
    "secret",
    "api_key",
    "apikey",
    "token",
    "credentials",
    "jdbcuri",
    "username",
];

pub fn is_credential_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    CREDENTIAL_KEYS.contains(&lowered.as_str())
}

/// Deep copy of `document` with every credential key, at any depth, mapped to
/// [`REDACTED_PLACEHOLDER`]. All other structure and key order is preserved.
pub fn redact_for_external_use(document: &Value) -> Value {
    match document {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                let redacted = if is_credential_key(key) {
                    Value::String(REDACTED_PLACEHOLDER.to_string())
                } else {
                    redact_for_external_use(value)
                };
                out.insert(key.clone(), redacted);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_for_external_use).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_credentials_are_replaced() {
        let doc = json!({
            "catalogs": [{
                "name": "pg",
                "jdbc": {"username": "u", "Password": "p", "jdbcUri": "jdbc:x", "driverClass": "D"},
                "auth": {"nested": [{"API_KEY": "k", "Token": {"deep": 1}}]}
            }],
            "graph": {"vertices": []}
        });

        let redacted = redact_for_external_use(&doc);
        let jdbc = &redacted["catalogs"][0]["jdbc"];
        assert_eq!(jdbc["username"], REDACTED_PLACEHOLDER);
        assert_eq!(jdbc["Password"], REDACTED_PLACEHOLDER);
        assert_eq!(jdbc["jdbcUri"], REDACTED_PLACEHOLDER);
        assert_eq!(jdbc["driverClass"], "D");

        let nested = &redacted["catalogs"][0]["auth"]["nested"][0];
        assert_eq!(nested["API_KEY"], REDACTED_PLACEHOLDER);
        // whole subtree replaced, not descended into
        assert_eq!(nested["Token"], REDACTED_PLACEHOLDER);
    }

    #[test]
    fn test_non_credential_structure_is_untouched() {
        let doc = json!({"graph": {"vertices": [{"label": "Customer", "tokens_used": 3}]}, "n": null});
        assert_eq!(redact_for_external_use(&doc), doc);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let doc = json!({"secret": "keep-me-here"});
        let _ = redact_for_external_use(&doc);
        assert_eq!(doc["secret"], "keep-me-here");
    }
}
