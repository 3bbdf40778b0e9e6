use serde::Serialize;
use serde_json::{json, Value};

/// Outcome of a tool call. Failures are data handed back to the model,
/// not errors that abort the conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolResult {
    /// Payload passed through verbatim.
    Success(Value),
    Failure(ToolFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolFailure {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ToolResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Failure(ToolFailure {
            error: message.into(),
            status_code: None,
        })
    }

    pub fn http_error(message: impl Into<String>, status_code: u16) -> Self {
        Self::Failure(ToolFailure {
            error: message.into(),
            status_code: Some(status_code),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The JSON the model sees: the serialized form of `self`.
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| json!({ "error": e.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_verbatim() {
        let body = json!({"login": "octocat", "followers": 10});
        let r = ToolResult::Success(body.clone());
        assert_eq!(r.to_payload(), body);
        assert_eq!(serde_json::to_value(&r).unwrap(), body);
        assert!(!r.is_error());
    }

    #[test]
    fn http_failure_carries_status() {
        let r = ToolResult::http_error("Not Found", 404);
        assert!(r.is_error());
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"error": "Not Found", "status_code": 404})
        );
        assert_eq!(r.to_payload(), serde_json::to_value(&r).unwrap());
    }

    #[test]
    fn plain_failure_omits_status() {
        let payload = ToolResult::error("connection refused").to_payload();
        assert_eq!(payload, json!({"error": "connection refused"}));
        assert!(payload.get("status_code").is_none());
    }
}
