//! RPC wire format: newline-delimited JSON envelopes.
//!
//! One request per line, one response per line. The envelope is stable; the
//! operation set is extensible.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request envelope: `{"operation": ..., "args": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub operation: String,

    #[serde(default)]
    pub args: Value,
}

/// A response envelope: `{"success": true, "data": ...}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// A successful response carrying `data`.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    /// A failure response carrying the error text.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_parses_without_args() {
        let req: Request = serde_json::from_str(r#"{"operation":"health"}"#).unwrap();
        assert_eq!(req.operation, "health");
        assert!(req.args.is_null());
    }

    #[test]
    fn response_shapes() {
        let ok = Response::ok(serde_json::json!({"n": 1}));
        let text = serde_json::to_string(&ok).unwrap();
        assert!(text.contains(r#""success":true"#));
        assert!(!text.contains("error"));

        let err = Response::err("unknown operation 'zap'");
        let text = serde_json::to_string(&err).unwrap();
        assert!(text.contains(r#""success":false"#));
        assert!(text.contains("zap"));
        // Null data is omitted from the wire.
        assert!(!text.contains("data"));
    }

    #[test]
    fn envelope_roundtrip() {
        let req = Request {
            operation: "create".into(),
            args: serde_json::json!({"title": "New bead"}),
        };
        let line = serde_json::to_string(&req).unwrap();
        let back: Request = serde_json::from_str(&line).unwrap();
        assert_eq!(back.operation, "create");
        assert_eq!(back.args["title"], "New bead");
    }
}
