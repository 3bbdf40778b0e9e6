use serde_json::Value;

/// Events emitted during a dispatch, for interactive display.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    ModelCall { round: usize },
    Text { content: String },
    ToolCall { name: String, arguments: Value },
    ToolResult { name: String, output: Value, is_error: bool },
    Finished { model_calls: usize },
}
