use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::InferenceProvider;
use crate::error::InferenceError;
use crate::tools::ToolDescriptor;
use crate::types::{
    ContentBlock, InferenceRequest, InferenceResponse, Message, StopReason, ToolCall, ToolChoice,
    Usage,
};

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini via the `generateContent` REST endpoint.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_API_URL.into(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// All descriptors go into a single `functionDeclarations` tool.
    fn convert_tools(tools: &[ToolDescriptor]) -> Value {
        let declarations: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                })
            })
            .collect();
        json!([{ "functionDeclarations": declarations }])
    }

    /// Gemini has two roles. Tool results go back as a `user` turn of
    /// `functionResponse` parts, in call order. Model turns are replayed as
    /// received, signatures and provider-issued ids included.
    fn convert_messages(messages: &[Message]) -> Vec<Value> {
        let mut provider_ids = HashSet::new();
        let mut out = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg {
                Message::User(text) => {
                    out.push(json!({ "role": "user", "parts": [{ "text": text }] }))
                }
                Message::Model(blocks) => {
                    let parts: Vec<Value> = blocks
                        .iter()
                        .map(|b| match b {
                            ContentBlock::Text(t) => json!({ "text": t }),
                            ContentBlock::ToolUse(call) => {
                                let mut function_call =
                                    json!({ "name": call.name, "args": call.arguments });
                                if !call.id_generated {
                                    function_call["id"] = json!(call.id);
                                    provider_ids.insert(call.id.as_str());
                                }
                                let mut part = json!({ "functionCall": function_call });
                                if let Some(ref signature) = call.signature {
                                    part["thoughtSignature"] = json!(signature);
                                }
                                part
                            }
                        })
                        .collect();
                    out.push(json!({ "role": "model", "parts": parts }));
                }
                Message::ToolResults(results) => {
                    let parts: Vec<Value> = results
                        .iter()
                        .map(|r| {
                            // `response` must be a JSON object.
                            let response = match r.result.to_payload() {
                                Value::Object(map) => Value::Object(map),
                                other => json!({ "result": other }),
                            };
                            let mut function_response =
                                json!({ "name": r.name, "response": response });
                            if provider_ids.contains(r.call_id.as_str()) {
                                function_response["id"] = json!(r.call_id);
                            }
                            json!({ "functionResponse": function_response })
                        })
                        .collect();
                    out.push(json!({ "role": "user", "parts": parts }));
                }
            }
        }

        out
    }

    fn build_body(request: &InferenceRequest) -> Value {
        let mut body = json!({
            "contents": Self::convert_messages(&request.messages),
            "generationConfig": { "maxOutputTokens": request.max_tokens },
        });

        if let Some(ref system) = request.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        if !request.tools.is_empty() {
            body["tools"] = Self::convert_tools(&request.tools);
            if request.tool_choice == ToolChoice::None {
                body["toolConfig"] = json!({ "functionCallingConfig": { "mode": "NONE" } });
            }
        }

        body
    }

    fn parse_response(parsed: &Value) -> Result<InferenceResponse, InferenceError> {
        let Some(candidate) = parsed["candidates"].get(0) else {
            let reason = parsed["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("no candidates returned");
            return Err(InferenceError::Parse(format!("empty response: {reason}")));
        };

        let mut content = Vec::new();
        let parts = candidate["content"]["parts"].as_array().cloned().unwrap_or_default();
        for (i, part) in parts.iter().enumerate() {
            if let Some(text) = part["text"].as_str() {
                if !text.is_empty() {
                    content.push(ContentBlock::Text(text.to_string()));
                }
            } else if let Some(call) = part.get("functionCall") {
                let name = call["name"]
                    .as_str()
                    .ok_or_else(|| InferenceError::Parse("functionCall without a name".into()))?;
                let arguments = match call.get("args") {
                    Some(args) if !args.is_null() => args.clone(),
                    _ => json!({}),
                };
                let mut tool_call = match call["id"].as_str() {
                    Some(id) => ToolCall::new(id, name, arguments),
                    None => ToolCall {
                        id_generated: true,
                        ..ToolCall::new(format!("call_{i}"), name, arguments)
                    },
                };
                tool_call.signature = part["thoughtSignature"].as_str().map(String::from);
                content.push(ContentBlock::ToolUse(tool_call));
            }
        }

        let has_calls = content.iter().any(|b| matches!(b, ContentBlock::ToolUse(_)));
        // Gemini reports STOP even when it wants a function called.
        let stop_reason = match candidate["finishReason"].as_str() {
            _ if has_calls => StopReason::ToolUse,
            None | Some("STOP") => StopReason::EndTurn,
            Some("MAX_TOKENS") => StopReason::MaxTokens,
            Some(other) => StopReason::Other(other.to_string()),
        };

        let usage = Usage::from_counts(
            &parsed["usageMetadata"]["promptTokenCount"],
            &parsed["usageMetadata"]["candidatesTokenCount"],
        );

        Ok(InferenceResponse {
            stop_reason,
            content,
            usage,
        })
    }
}

#[async_trait]
impl InferenceProvider for GeminiProvider {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let body = Self::build_body(&request);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            tool_choice = ?request.tool_choice,
            "gemini inference request"
        );

        let resp = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url.trim_end_matches('/'),
                request.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(InferenceError::ApiError { status, body: text });
        }

        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| InferenceError::Parse(e.to_string()))?;

        Self::parse_response(&parsed)
    }
}
