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

/// OpenAI-compatible provider. Works with vLLM, LM Studio, OpenRouter,
/// or any server that implements the `/v1/chat/completions` endpoint.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: None,
        }
    }

    /// Set an API key (required for OpenAI, OpenRouter, etc.).
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn convert_tools(tools: &[ToolDescriptor]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }

    fn convert_messages(system: Option<&str>, messages: &[Message]) -> Vec<Value> {
        let mut out = Vec::new();

        if let Some(sys) = system {
            out.push(json!({ "role": "system", "content": sys }));
        }

        for msg in messages {
            match msg {
                Message::User(text) => out.push(json!({ "role": "user", "content": text })),
                Message::Model(blocks) => {
                    let mut text_parts = Vec::new();
                    let mut tool_calls = Vec::new();

                    for block in blocks {
                        match block {
                            ContentBlock::Text(t) => text_parts.push(t.as_str()),
                            ContentBlock::ToolUse(call) => tool_calls.push(json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments.to_string(),
                                }
                            })),
                        }
                    }

                    let mut assistant_msg =
                        json!({ "role": "assistant", "content": text_parts.join("\n") });
                    if !tool_calls.is_empty() {
                        assistant_msg["tool_calls"] = Value::Array(tool_calls);
                    }
                    out.push(assistant_msg);
                }
                // One `tool` message per result, keyed by the call id.
                Message::ToolResults(results) => {
                    for r in results {
                        out.push(json!({
                            "role": "tool",
                            "tool_call_id": r.call_id,
                            "content": r.result.to_payload().to_string(),
                        }));
                    }
                }
            }
        }

        out
    }

    fn parse_response(parsed: &Value) -> Result<InferenceResponse, InferenceError> {
        let choice = parsed["choices"]
            .get(0)
            .ok_or_else(|| InferenceError::Parse("no choices in response".into()))?;

        let stop_reason = match choice["finish_reason"].as_str().unwrap_or("stop") {
            "stop" => StopReason::EndTurn,
            "tool_calls" => StopReason::ToolUse,
            "length" => StopReason::MaxTokens,
            other => StopReason::Other(other.to_string()),
        };

        let message = &choice["message"];
        let mut content = Vec::new();

        if let Some(text) = message["content"].as_str() {
            if !text.is_empty() {
                content.push(ContentBlock::Text(text.to_string()));
            }
        }

        if let Some(tool_calls) = message["tool_calls"].as_array() {
            for tc in tool_calls {
                let args_str = tc["function"]["arguments"].as_str().unwrap_or("{}");
                let arguments: Value = serde_json::from_str(args_str).map_err(|e| {
                    InferenceError::Parse(format!("tool call arguments are not JSON: {e}"))
                })?;

                content.push(ContentBlock::ToolUse(ToolCall::new(
                    tc["id"].as_str().unwrap_or(""),
                    tc["function"]["name"].as_str().unwrap_or(""),
                    arguments,
                )));
            }
        }

        let usage = Usage::from_counts(
            &parsed["usage"]["prompt_tokens"],
            &parsed["usage"]["completion_tokens"],
        );

        Ok(InferenceResponse {
            stop_reason,
            content,
            usage,
        })
    }

    fn build_body(request: &InferenceRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": Self::convert_messages(request.system.as_deref(), &request.messages),
        });

        if !request.tools.is_empty() {
            body["tools"] = Value::Array(Self::convert_tools(&request.tools));
            if request.tool_choice == ToolChoice::None {
                body["tool_choice"] = json!("none");
            }
        }

        body
    }
}

#[async_trait]
impl InferenceProvider for OpenAiProvider {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let body = Self::build_body(&request);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tool_choice = ?request.tool_choice,
            "openai inference request"
        );

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/')))
            .header("content-type", "application/json");

        if let Some(ref key) = self.api_key {
            req = req.header("authorization", format!("Bearer {key}"));
        }

        let resp = req
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        if status != 200 {
            return Err(InferenceError::ApiError { status, body: text });
        }

        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| InferenceError::Parse(e.to_string()))?;

        Self::parse_response(&parsed)
    }
}
