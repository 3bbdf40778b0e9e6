pub mod conversation;
pub mod error;
pub mod events;
pub mod inference;
pub mod secrets;
pub mod tools;
pub mod types;

use tokio::sync::mpsc::Sender;
use tracing::{info, warn};

pub use conversation::{Conversation, DispatchState, ToolExchange};
pub use error::{AgentError, CredentialError, InferenceError};
pub use events::AgentEvent;
pub use inference::{GeminiProvider, InferenceProvider, OpenAiProvider};
pub use secrets::{load_credential, EnvSecretStore, FileSecretStore, SecretStore, StaticSecretStore};
pub use tools::{GitHubUserTool, ToolDescriptor, ToolHandler, ToolRegistry, ToolResult};
pub use types::{
    ContentBlock, InferenceRequest, InferenceResponse, Message, StopReason, ToolCall, ToolChoice,
    Usage,
};

/// Secret the Gemini provider's key is read from.
pub const GEMINI_KEY_SECRET: &str = "GOOGLE_API_KEY";

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: String,
    pub max_tokens: u32,
    /// Tool rounds allowed before the model must answer in text.
    pub max_tool_rounds: usize,
    pub system: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".into(),
            max_tokens: 1024,
            max_tool_rounds: 1,
            system: Some(
                "You answer questions about GitHub users. Use the fetch_user_info tool to look \
                 up profiles. If a lookup returns an error, explain it to the user plainly."
                    .into(),
            ),
        }
    }
}

/// Result of an agent invocation.
#[derive(Debug)]
pub struct AgentResult {
    pub text: String,
    pub model_calls: usize,
    pub tool_calls: Vec<ToolExchange>,
    pub usage: Usage,
}

/// The agent. Wire up a provider and tools, and go.
///
/// Each invocation is independent: a fresh [`Conversation`] is built per
/// prompt and dropped when the answer is returned.
pub struct Agent {
    provider: Box<dyn InferenceProvider>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Agent {
    pub fn new(
        provider: impl InferenceProvider + 'static,
        tools: ToolRegistry,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider: Box::new(provider),
            tools,
            config,
        }
    }

    /// Simple invocation. Runs until the model answers in text.
    pub async fn invoke(&self, prompt: &str) -> Result<AgentResult, AgentError> {
        self.run(prompt, None).await
    }

    /// Invocation with streaming events.
    pub async fn invoke_streaming(
        &self,
        prompt: &str,
        tx: Sender<AgentEvent>,
    ) -> Result<AgentResult, AgentError> {
        self.run(prompt, Some(&tx)).await
    }

    async fn run(
        &self,
        prompt: &str,
        tx: Option<&Sender<AgentEvent>>,
    ) -> Result<AgentResult, AgentError> {
        let mut conversation = Conversation::new(prompt);
        if let Some(ref system) = self.config.system {
            conversation = conversation.with_system(system);
        }

        let descriptors = self.tools.descriptors();
        let mut usage = Usage::default();
        let mut tool_calls = Vec::new();
        let mut model_calls = 0;
        let mut tool_rounds = 0;

        loop {
            emit(tx, AgentEvent::ModelCall { round: model_calls }).await;
            info!(round = model_calls, model = %self.config.model, "model call");

            // Once the last tool round is spent, the model must answer in text.
            let tool_choice = if tool_rounds >= self.config.max_tool_rounds {
                ToolChoice::None
            } else {
                ToolChoice::Auto
            };
            let request = conversation.build_request(
                &self.config.model,
                self.config.max_tokens,
                descriptors.clone(),
                tool_choice,
            );
            let response = self.provider.infer(request).await?;
            model_calls += 1;
            usage.accumulate(&response.usage);

            let text = response.text();
            if !text.is_empty() {
                emit(tx, AgentEvent::Text { content: text }).await;
            }

            let state = conversation.record_response(&response)?.clone();
            match state {
                DispatchState::Done(text) => {
                    emit(tx, AgentEvent::Finished { model_calls }).await;
                    info!(model_calls, tool_calls = tool_calls.len(), "agent finished");
                    return Ok(AgentResult {
                        text,
                        model_calls,
                        tool_calls,
                        usage,
                    });
                }
                DispatchState::ToolRequested(calls) => {
                    if tool_rounds >= self.config.max_tool_rounds {
                        warn!(tool_rounds, "model requested tools after the last allowed round");
                        return Err(AgentError::ToolRoundsExhausted {
                            rounds: tool_rounds,
                        });
                    }
                    // Refuse the whole round before running anything.
                    if let Some(unknown) = calls.iter().find(|c| !self.tools.contains(&c.name)) {
                        warn!(tool = %unknown.name, "model requested an unknown tool");
                        return Err(self.tools.unknown(&unknown.name));
                    }
                    tool_rounds += 1;

                    let mut exchanges = Vec::with_capacity(calls.len());
                    for call in calls {
                        emit(
                            tx,
                            AgentEvent::ToolCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        )
                        .await;
                        info!(tool = %call.name, arguments = %call.arguments, "executing tool");

                        let result = self.tools.execute(&call.name, &call.arguments).await?;

                        emit(
                            tx,
                            AgentEvent::ToolResult {
                                name: call.name.clone(),
                                output: result.to_payload(),
                                is_error: result.is_error(),
                            },
                        )
                        .await;
                        exchanges.push(ToolExchange { call, result });
                    }

                    conversation.record_tool_results(&exchanges)?;
                    tool_calls.extend(exchanges);
                }
                DispatchState::AwaitingModel => {
                    return Err(AgentError::Conversation(
                        "conversation did not advance after a model response".into(),
                    ));
                }
            }
        }
    }
}

async fn emit(tx: Option<&Sender<AgentEvent>>, event: AgentEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event).await;
    }
}
