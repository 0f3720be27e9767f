//! Stateful conversation over a stateless provider.
//!
//! Callers hand [`ChatSession::send`] only what is new in a round (the
//! opening messages, or a single tool result) and record what the model
//! answered with [`ChatSession::record_reply`]; the session keeps the full
//! transcript and replays it on every request.

use crate::traits::{ChatRequest, LlmProvider};
use crate::registry::RoleBinding;
use pr_domain::error::Result;
use pr_domain::stream::{BoxStream, StreamEvent};
use pr_domain::tool::{Message, ToolCall, ToolDefinition};
use std::sync::Arc;

pub struct ChatSession {
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
    tools: Vec<ToolDefinition>,
    temperature: Option<f32>,
    history: Vec<Message>,
}

impl ChatSession {
    pub fn new(binding: RoleBinding) -> Self {
        Self {
            provider: binding.provider,
            model: binding.model,
            tools: Vec::new(),
            temperature: None,
            history: Vec::new(),
        }
    }

    /// Offer these tools on every request. Ignored for providers that do
    /// not advertise tool support.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        if self.provider.capabilities().can_call_tools() {
            self.tools = tools;
        } else if !tools.is_empty() {
            tracing::debug!(
                provider = %self.provider.provider_id(),
                "provider has no tool support; tools not offered"
            );
        }
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn provider_id(&self) -> &str {
        self.provider.provider_id()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Append `new_messages` and stream the model's answer to the whole
    /// transcript.
    pub async fn send(
        &mut self,
        new_messages: Vec<Message>,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        self.history.extend(new_messages);
        let req = ChatRequest {
            messages: self.history.clone(),
            tools: self.tools.clone(),
            temperature: self.temperature,
            max_tokens: None,
            json_mode: false,
            model: self.model.clone(),
        };
        self.provider.chat_stream(&req).await
    }

    /// Record the assistant side of the round that just finished.
    pub fn record_reply(&mut self, text: &str, call: Option<&ToolCall>) {
        match call {
            Some(call) => self.history.push(Message::assistant_tool_call(text, call)),
            None if !text.is_empty() => self.history.push(Message::assistant(text)),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{Scripted, ScriptedProvider};
    use futures_util::StreamExt;
    use pr_domain::tool::Role;

    async fn drain(stream: BoxStream<'static, Result<StreamEvent>>) -> Vec<StreamEvent> {
        stream.map(|e| e.unwrap()).collect().await
    }

    #[tokio::test]
    async fn transcript_accumulates_across_rounds() {
        let provider = Arc::new(
            ScriptedProvider::new("s")
                .with_round(vec![Scripted::call(
                    "generate_risk_gauge",
                    serde_json::json!({"ticker": "TCS"}),
                )])
                .with_round(vec![Scripted::token("Risk is moderate.")]),
        );
        let mut session = ChatSession::new(RoleBinding {
            provider: provider.clone(),
            model: Some("m".into()),
        });

        drain(
            session
                .send(vec![Message::system("sys"), Message::user("risk of TCS?")])
                .await
                .unwrap(),
        )
        .await;
        let call = ToolCall {
            call_id: "call_0".into(),
            tool_name: "generate_risk_gauge".into(),
            arguments: serde_json::json!({"ticker": "TCS"}),
        };
        session.record_reply("", Some(&call));
        drain(
            session
                .send(vec![Message::tool_result("call_0", "{\"result\":\"ok\"}")])
                .await
                .unwrap(),
        )
        .await;

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].messages.len(), 2);
        let roles: Vec<Role> = requests[1].messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool]
        );
        assert_eq!(requests[1].model.as_deref(), Some("m"));
    }

    #[test]
    fn empty_reply_without_call_is_not_recorded() {
        let mut session = ChatSession::new(RoleBinding {
            provider: Arc::new(ScriptedProvider::new("s")),
            model: None,
        });
        session.record_reply("", None);
        assert!(session.history().is_empty());
    }
}
