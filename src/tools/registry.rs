use serde_json::Value;

use super::descriptor::ToolDescriptor;
use super::handler::{ToolDef, ToolHandler};
use super::result::ToolResult;
use crate::error::AgentError;

/// Catalog of available tools, keyed by descriptor name. Dispatch resolves
/// the model's requested name here; nothing inspects handler signatures.
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool under `descriptor.name`. A later registration with
    /// the same name replaces the earlier one.
    pub fn add(mut self, descriptor: ToolDescriptor, handler: impl ToolHandler + 'static) -> Self {
        self.tools.retain(|t| t.descriptor.name != descriptor.name);
        self.tools.push(ToolDef {
            descriptor,
            handler: Box::new(handler),
        });
        self
    }

    /// All descriptors for the LLM API request.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Run a tool by name with the arguments exactly as given.
    pub async fn execute(&self, name: &str, arguments: &Value) -> Result<ToolResult, AgentError> {
        let tool = self.find(name).ok_or_else(|| self.unknown(name))?;
        Ok(tool.handler.call(arguments).await)
    }

    pub(crate) fn unknown(&self, name: &str) -> AgentError {
        AgentError::UnknownTool {
            name: name.to_string(),
            known: self.tool_names().into_iter().map(String::from).collect(),
        }
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.descriptor.name.as_str()).collect()
    }

    fn find(&self, name: &str) -> Option<&ToolDef> {
        self.tools.iter().find(|t| t.descriptor.name == name)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait::async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, arguments: &Value) -> ToolResult {
            ToolResult::Success(arguments.clone())
        }
    }

    struct ConstHandler(&'static str);

    #[async_trait::async_trait]
    impl ToolHandler for ConstHandler {
        async fn call(&self, _arguments: &Value) -> ToolResult {
            ToolResult::Success(json!(self.0))
        }
    }

    fn test_registry() -> ToolRegistry {
        ToolRegistry::new()
            .add(
                ToolDescriptor::new("echo", "Echo the arguments back").param(
                    "msg",
                    "string",
                    "Text to echo",
                    true,
                ),
                EchoHandler,
            )
            .add(ToolDescriptor::new("ping", "Reply with pong"), ConstHandler("pong"))
    }

    #[tokio::test]
    async fn execute_resolves_by_name_with_given_arguments() {
        let reg = test_registry();
        let result = reg.execute("echo", &json!({"msg": "hi"})).await.unwrap();
        assert_eq!(result, ToolResult::Success(json!({"msg": "hi"})));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let reg = test_registry();
        let err = reg.execute("rm_rf", &json!({})).await.unwrap_err();
        match err {
            AgentError::UnknownTool { name, known } => {
                assert_eq!(name, "rm_rf");
                assert_eq!(known, vec!["echo", "ping"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn re_adding_a_name_replaces_the_handler() {
        let reg = test_registry().add(ToolDescriptor::new("ping", "Reply"), ConstHandler("PONG"));
        assert_eq!(reg.tool_names(), vec!["echo", "ping"]);
        let result = reg.execute("ping", &json!({})).await.unwrap();
        assert_eq!(result, ToolResult::Success(json!("PONG")));
    }

    #[test]
    fn descriptors_keep_registration_order() {
        let reg = test_registry();
        let names: Vec<String> = reg.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["echo", "ping"]);
        assert!(reg.contains("ping"));
        assert!(reg.descriptors()[0].parameters.required.contains(&"msg".into()));
    }
}
