use tracing::debug;

use crate::error::AgentError;
use crate::tools::{ToolDescriptor, ToolResult};
use crate::types::{
    InferenceRequest, InferenceResponse, Message, ToolCall, ToolChoice, ToolResponse,
};

/// Where a conversation stands between model calls.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchState {
    /// A request is ready to go to the model.
    AwaitingModel,
    /// The model asked for these tools; results must be recorded next.
    ToolRequested(Vec<ToolCall>),
    /// Final text for the user.
    Done(String),
}

/// One executed tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExchange {
    pub call: ToolCall,
    pub result: ToolResult,
}

/// Append-only message history for a single prompt, plus the dispatch
/// state derived from it. Owns everything the model sees.
#[derive(Debug, Clone)]
pub struct Conversation {
    system: Option<String>,
    messages: Vec<Message>,
    state: DispatchState,
}

impl Conversation {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            messages: vec![Message::User(prompt.into())],
            state: DispatchState::AwaitingModel,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Build the next inference request from the full history.
    pub fn build_request(
        &self,
        model: &str,
        max_tokens: u32,
        tools: Vec<ToolDescriptor>,
        tool_choice: ToolChoice,
    ) -> InferenceRequest {
        InferenceRequest {
            model: model.to_string(),
            max_tokens,
            system: self.system.clone(),
            tools,
            tool_choice,
            messages: self.messages.clone(),
        }
    }

    /// Record what the model said and move to `ToolRequested` or `Done`.
    pub fn record_response(
        &mut self,
        response: &InferenceResponse,
    ) -> Result<&DispatchState, AgentError> {
        if self.state != DispatchState::AwaitingModel {
            return Err(AgentError::Conversation(format!(
                "model response recorded while in state {:?}",
                self.state
            )));
        }

        self.messages.push(Message::Model(response.content.clone()));

        let calls: Vec<ToolCall> = response.tool_calls().into_iter().cloned().collect();
        self.state = if calls.is_empty() {
            DispatchState::Done(response.text())
        } else {
            DispatchState::ToolRequested(calls)
        };

        debug!(messages = self.messages.len(), state = ?self.state, "response recorded");
        Ok(&self.state)
    }

    /// Record results for every requested call, in request order, and hand
    /// the conversation back to the model.
    pub fn record_tool_results(&mut self, exchanges: &[ToolExchange]) -> Result<(), AgentError> {
        let DispatchState::ToolRequested(ref calls) = self.state else {
            return Err(AgentError::Conversation(format!(
                "tool results recorded while in state {:?}",
                self.state
            )));
        };

        let matches = calls.len() == exchanges.len()
            && calls.iter().zip(exchanges).all(|(c, e)| c.id == e.call.id);
        if !matches {
            return Err(AgentError::Conversation(
                "tool results do not match the requested calls".into(),
            ));
        }

        self.messages.push(Message::ToolResults(
            exchanges
                .iter()
                .map(|e| ToolResponse {
                    call_id: e.call.id.clone(),
                    name: e.call.name.clone(),
                    result: e.result.clone(),
                })
                .collect(),
        ));
        self.state = DispatchState::AwaitingModel;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentBlock, StopReason, Usage};
    use serde_json::json;

    fn text_response(text: &str) -> InferenceResponse {
        InferenceResponse {
            stop_reason: StopReason::EndTurn,
            content: vec![ContentBlock::Text(text.into())],
            usage: Usage::default(),
        }
    }

    fn call(id: &str) -> ToolCall {
        ToolCall::new(id, "fetch_user_info", json!({ "username": "google" }))
    }

    fn tool_response(calls: Vec<ToolCall>) -> InferenceResponse {
        InferenceResponse {
            stop_reason: StopReason::ToolUse,
            content: calls.into_iter().map(ContentBlock::ToolUse).collect(),
            usage: Usage::default(),
        }
    }

    #[test]
    fn text_response_finishes() {
        let mut conv = Conversation::new("hello");
        let state = conv.record_response(&text_response("hi there")).unwrap();
        assert_eq!(state, &DispatchState::Done("hi there".into()));
        assert_eq!(conv.messages().len(), 2);
    }

    #[test]
    fn tool_round_trip_returns_to_awaiting_model() {
        let mut conv = Conversation::new("who is google?").with_system("be brief");
        conv.record_response(&tool_response(vec![call("call_0")])).unwrap();
        assert_eq!(conv.state(), &DispatchState::ToolRequested(vec![call("call_0")]));

        let exchange = ToolExchange {
            call: call("call_0"),
            result: ToolResult::Success(json!({ "login": "google" })),
        };
        conv.record_tool_results(&[exchange]).unwrap();
        assert_eq!(conv.state(), &DispatchState::AwaitingModel);

        let req = conv.build_request("m", 128, vec![], ToolChoice::None);
        assert_eq!(req.tool_choice, ToolChoice::None);
        assert_eq!(req.system.as_deref(), Some("be brief"));
        assert_eq!(req.messages.len(), 3);
        assert_eq!(req.messages[0], Message::User("who is google?".into()));
        assert!(matches!(&req.messages[2], Message::ToolResults(r) if r[0].call_id == "call_0"));
    }

    #[test]
    fn results_must_match_requested_calls() {
        let mut conv = Conversation::new("q");
        conv.record_response(&tool_response(vec![call("call_0"), call("call_1")])).unwrap();

        let only_one = [ToolExchange {
            call: call("call_0"),
            result: ToolResult::error("x"),
        }];
        assert!(conv.record_tool_results(&only_one).is_err());
        assert!(matches!(conv.state(), DispatchState::ToolRequested(_)));
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let mut conv = Conversation::new("q");
        assert!(conv.record_tool_results(&[]).is_err());

        conv.record_response(&text_response("done")).unwrap();
        let err = conv.record_response(&text_response("again")).unwrap_err();
        assert!(matches!(err, AgentError::Conversation(_)));
        assert_eq!(conv.messages().len(), 2);
    }
}
