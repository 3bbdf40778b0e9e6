use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::{ToolDescriptor, ToolResult};

/// Fully-formed request — the provider just sends it.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: Option<String>,
    pub tools: Vec<ToolDescriptor>,
    pub tool_choice: ToolChoice,
    pub messages: Vec<Message>,
}

/// Whether the model may answer with function calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// The model decides.
    #[default]
    Auto,
    /// Declarations are still sent, but the model must answer in text.
    None,
}

/// What came back from the LLM.
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub stop_reason: StopReason,
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

impl InferenceResponse {
    /// Function-call requests in the order the model emitted them.
    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse(call) => Some(call),
                ContentBlock::Text(_) => None,
            })
            .collect()
    }

    /// Text blocks joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text(t) => Some(t.as_str()),
                ContentBlock::ToolUse(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    /// Provider-specific reason we don't model (safety, recitation, ...).
    Other(String),
}

/// A content block in the model's response.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text(String),
    ToolUse(ToolCall),
}

/// A structured request from the model to run a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    /// Opaque provider token that must be replayed with the call
    /// (Gemini `thoughtSignature`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// The provider gave no id and `id` was made up locally, so it is
    /// never sent back.
    #[serde(default)]
    pub id_generated: bool,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            signature: None,
            id_generated: false,
        }
    }
}

/// One entry of a conversation, in provider-neutral form.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    User(String),
    Model(Vec<ContentBlock>),
    ToolResults(Vec<ToolResponse>),
}

/// A tool's result, addressed to the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub call_id: String,
    pub name: String,
    pub result: ToolResult,
}

/// Token usage for a single inference call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    /// Build from raw JSON counts. Missing counts are zero; counts too
    /// large for `u32` saturate.
    pub fn from_counts(input: &Value, output: &Value) -> Self {
        fn count(v: &Value) -> u32 {
            v.as_u64().map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
        }
        Self {
            input_tokens: count(input),
            output_tokens: count(output),
        }
    }

    pub fn accumulate(&mut self, other: &Usage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }
}
