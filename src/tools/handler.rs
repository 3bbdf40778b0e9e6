use async_trait::async_trait;
use serde_json::Value;

use super::descriptor::ToolDescriptor;
use super::result::ToolResult;

/// A tool's execution handler. Consumers implement this for each tool.
/// Handlers report failure through [`ToolResult::Failure`], never by panicking.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: &Value) -> ToolResult;
}

/// A tool definition: descriptor for the LLM + handler for execution.
pub struct ToolDef {
    pub descriptor: ToolDescriptor,
    pub(crate) handler: Box<dyn ToolHandler>,
}
