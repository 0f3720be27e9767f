//! A provider that replays canned responses.
//!
//! Each call to [`LlmProvider::chat_stream`] pops the next queued round;
//! each call to [`LlmProvider::chat`] pops the next queued reply. Every
//! request is recorded so tests can assert on what was sent.

use crate::traits::{ChatRequest, ChatResponse, LlmProvider};
use parking_lot::Mutex;
use pr_domain::capability::{LlmCapabilities, ToolSupport};
use pr_domain::error::{Error, Result};
use pr_domain::stream::{BoxStream, StreamEvent};
use std::collections::VecDeque;

/// One event in a scripted streaming round.
#[derive(Debug, Clone)]
pub enum Scripted {
    Token(String),
    ToolCall {
        name: String,
        arguments: serde_json::Value,
    },
    /// A transport failure in the middle of the stream.
    Fail(String),
}

impl Scripted {
    pub fn token(text: impl Into<String>) -> Self {
        Self::Token(text.into())
    }

    pub fn call(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self::ToolCall {
            name: name.into(),
            arguments,
        }
    }
}

enum Round {
    Events(Vec<Scripted>),
    /// `chat_stream` itself fails before any event.
    Refuse(String),
}

pub struct ScriptedProvider {
    id: String,
    capabilities: LlmCapabilities,
    rounds: Mutex<VecDeque<Round>>,
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capabilities: LlmCapabilities {
                supports_tools: ToolSupport::Basic,
                supports_streaming: true,
                supports_json_mode: true,
                context_window_tokens: None,
            },
            rounds: Mutex::new(VecDeque::new()),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a streaming round.
    pub fn with_round(self, events: Vec<Scripted>) -> Self {
        self.rounds.lock().push_back(Round::Events(events));
        self
    }

    /// Queue a streaming round that fails to open.
    pub fn with_refused_round(self, message: impl Into<String>) -> Self {
        self.rounds.lock().push_back(Round::Refuse(message.into()));
        self
    }

    /// Queue a non-streaming reply.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().push_back(Ok(text.into()));
        self
    }

    /// Queue a non-streaming failure.
    pub fn with_reply_error(self, message: impl Into<String>) -> Self {
        self.replies.lock().push_back(Err(Error::Provider {
            provider: self.id.clone(),
            message: message.into(),
        }));
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    /// Number of streaming rounds not yet consumed.
    pub fn remaining_rounds(&self) -> usize {
        self.rounds.lock().len()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().push(req.clone());
        let reply = self.replies.lock().pop_front().unwrap_or_else(|| {
            Err(Error::Provider {
                provider: self.id.clone(),
                message: "no scripted reply queued".into(),
            })
        })?;
        Ok(ChatResponse {
            content: reply,
            tool_calls: Vec::new(),
            usage: None,
            model: req.model.clone().unwrap_or_else(|| "scripted".into()),
            finish_reason: Some("stop".into()),
        })
    }

    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        self.requests.lock().push(req.clone());
        let round = self
            .rounds
            .lock()
            .pop_front()
            .unwrap_or(Round::Events(Vec::new()));

        let events = match round {
            Round::Refuse(message) => {
                return Err(Error::Provider {
                    provider: self.id.clone(),
                    message,
                })
            }
            Round::Events(events) => events,
        };

        let mut out: Vec<Result<StreamEvent>> = Vec::with_capacity(events.len() + 1);
        let mut failed = false;
        for (i, event) in events.into_iter().enumerate() {
            match event {
                Scripted::Token(text) => out.push(Ok(StreamEvent::Token { text })),
                Scripted::ToolCall { name, arguments } => {
                    out.push(Ok(StreamEvent::ToolCallFinished {
                        call_id: format!("call_{i}"),
                        tool_name: name,
                        arguments,
                    }))
                }
                Scripted::Fail(message) => {
                    out.push(Err(Error::Http(message)));
                    failed = true;
                    break;
                }
            }
        }
        if !failed {
            out.push(Ok(StreamEvent::Done {
                usage: None,
                finish_reason: Some("stop".into()),
            }));
        }

        Ok(Box::pin(futures_util::stream::iter(out)))
    }

    fn capabilities(&self) -> &LlmCapabilities {
        &self.capabilities
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}
