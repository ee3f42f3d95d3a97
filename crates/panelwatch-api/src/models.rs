// Panel API response types
//
// X-UI style panels wrap every JSON answer in the same envelope:
// `{ "success": bool, "msg": "...", "obj": <payload> }`. The payload is
// kept as raw `serde_json::Value` here; shape normalization is the core
// crate's job because panel forks disagree on field layout.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard panel response envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PanelResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub obj: Option<Value>,
}

impl PanelResponse {
    /// Message text for error reporting, `"unknown error"` when absent.
    pub fn message(&self) -> String {
        self.msg
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or("unknown error")
            .to_owned()
    }
}

/// Parse the `obj` of an `onlines` response into client identifiers.
///
/// Some panel builds return a JSON array of strings, others a single
/// comma-separated string. Anything else yields an empty list.
pub fn parse_online_ids(obj: Option<&Value>) -> Vec<String> {
    match obj {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn online_ids_from_array() {
        let obj = json!(["a@x", "b@x", 3, ""]);
        assert_eq!(parse_online_ids(Some(&obj)), vec!["a@x", "b@x"]);
    }

    #[test]
    fn online_ids_from_comma_string() {
        let obj = json!("a@x, b@x,,c@x ");
        assert_eq!(parse_online_ids(Some(&obj)), vec!["a@x", "b@x", "c@x"]);
    }

    #[test]
    fn online_ids_from_null() {
        assert!(parse_online_ids(None).is_empty());
        assert!(parse_online_ids(Some(&Value::Null)).is_empty());
    }

    #[test]
    fn envelope_tolerates_missing_fields() {
        let resp: PanelResponse = serde_json::from_str("{}").unwrap();
        assert!(!resp.success);
        assert_eq!(resp.message(), "unknown error");
    }
}
