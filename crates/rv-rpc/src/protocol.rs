//! The wire shapes for the newline-delimited JSON-RPC 1.0 transport.
//!
//! Requests are `{"method", "params", "id"}`; every response carries
//! both `result` and `error` (one always null) plus the echoed `id`, so
//! a client can match replies without additional framing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
    pub id: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub result: Option<Value>,
    pub error: Option<RpcError>,
    pub id: Value,
}

impl RpcResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn err(id: Value, message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(RpcError { message: message.into() }),
            id,
        }
    }
}

/// Extracts the `idx`-th positional parameter as `T`, or a descriptive
/// error the caller can return verbatim.
pub fn param<T: serde::de::DeserializeOwned>(params: &[Value], idx: usize) -> Result<T, String> {
    let raw = params
        .get(idx)
        .ok_or_else(|| format!("missing parameter at position {idx}"))?;
    serde_json::from_value(raw.clone()).map_err(|err| format!("parameter {idx} has the wrong shape: {err}"))
}

/// Splits a chunk of text into the top-level `{...}` objects it
/// contains, tolerating braces inside string literals and escaped
/// quotes. Used to recover requests that arrived concatenated on one
/// line rather than newline-delimited.
pub fn split_balanced_objects(text: &str) -> Vec<String> {
    let mut objects = Vec::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = None;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(begin) = start.take() {
                        objects.push(text[begin..=idx].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    objects
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn param_reports_a_missing_index() {
        let params: Vec<Value> = vec![json!("acme")];
        let err = param::<String>(&params, 1).unwrap_err();
        assert!(err.contains("position 1"));
    }

    #[test]
    fn param_decodes_the_requested_type() {
        let params = vec![json!("acme"), json!(7)];
        let owner: String = param(&params, 0).unwrap();
        let number: u64 = param(&params, 1).unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(number, 7);
    }

    #[test]
    fn split_balanced_objects_recovers_concatenated_requests() {
        let text = r#"{"method":"Hello","params":[],"id":1}{"method":"Hello","params":[],"id":2}"#;
        let objects = split_balanced_objects(text);
        assert_eq!(objects.len(), 2);
        for object in &objects {
            let parsed: RpcRequest = serde_json::from_str(object).unwrap();
            assert_eq!(parsed.method, "Hello");
        }
    }

    #[test]
    fn split_balanced_objects_ignores_braces_inside_strings() {
        let text = r#"{"method":"AddComment","params":["a { b }"],"id":1}"#;
        let objects = split_balanced_objects(text);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0], text);
    }

    #[test]
    fn response_serializes_with_a_null_counterpart() {
        let ok = RpcResponse::ok(json!(1), json!({"a": 1}));
        let value = serde_json::to_value(&ok).unwrap();
        assert!(value["error"].is_null());

        let err = RpcResponse::err(json!(1), "boom");
        let value = serde_json::to_value(&err).unwrap();
        assert!(value["result"].is_null());
        assert_eq!(value["error"]["message"], "boom");
    }
}
