//! The bounded tool-invocation loop.
//!
//! One round streams a model reply, forwarding text as it arrives. If the
//! reply carried a tool call, the first one is executed, its display payload
//! forwarded, and its summary fed back as the only new message of the next
//! round. The loop stops after a round without a tool call, on a backend
//! failure, or after `max_rounds` rounds.

use std::time::Instant;

use futures_util::StreamExt;
use tokio::sync::mpsc;

use pr_domain::stream::{StreamEvent, Usage};
use pr_domain::tool::{Message, ToolCall};
use pr_domain::trace::TraceEvent;
use pr_providers::ChatSession;
use pr_tools::{ToolContext, ToolKind, ToolResult};

/// Events forwarded to the caller while the loop runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    TextDelta(String),
    /// A non-empty `[TAG:{json}]` display payload.
    ToolOutput(String),
}

impl LoopEvent {
    pub fn into_content(self) -> String {
        match self {
            LoopEvent::TextDelta(s) | LoopEvent::ToolOutput(s) => s,
        }
    }
}

/// What the loop leaves behind for persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Streamed text and display payloads, in emission order. The failure
    /// diagnostic is not part of it.
    pub text: String,
    pub rounds: usize,
    pub tool_calls: usize,
    pub dropped_tool_calls: usize,
    pub failed: bool,
}

pub struct ToolLoop<'a> {
    tools: &'a ToolContext,
    max_rounds: usize,
    tx: mpsc::Sender<LoopEvent>,
}

impl<'a> ToolLoop<'a> {
    pub fn new(tools: &'a ToolContext, max_rounds: usize, tx: mpsc::Sender<LoopEvent>) -> Self {
        Self {
            tools,
            max_rounds: max_rounds.max(1),
            tx,
        }
    }

    /// Run to completion. A closed receiver does not stop the loop, so the
    /// outcome can still be persisted after the caller went away.
    pub async fn run(&self, session: &mut ChatSession, opening: Vec<Message>) -> LoopOutcome {
        let mut outcome = LoopOutcome::default();
        let mut pending = opening;

        while outcome.rounds < self.max_rounds {
            outcome.rounds += 1;

            let round = match self.round(session, pending, &mut outcome).await {
                Ok(round) => round,
                Err(message) => {
                    tracing::warn!(round = outcome.rounds, error = %message, "tool loop aborted");
                    outcome.failed = true;
                    self.send(LoopEvent::TextDelta(format!("Error details: {message}")))
                        .await;
                    break;
                }
            };

            session.record_reply(&round.text, round.call.as_ref());

            let Some(call) = round.call else {
                break;
            };
            outcome.tool_calls += 1;

            let result = self.execute(&call).await;
            if result.has_payload() {
                outcome.text.push_str(&result.display_payload);
                self.send(LoopEvent::ToolOutput(result.display_payload.clone()))
                    .await;
            }
            pending = vec![Message::tool_result(&call.call_id, result.model_content())];
        }

        TraceEvent::ToolLoopFinished {
            rounds: outcome.rounds,
            tool_calls: outcome.tool_calls,
            dropped_tool_calls: outcome.dropped_tool_calls,
            text_chars: outcome.text.chars().count(),
            failed: outcome.failed,
        }
        .emit();
        outcome
    }

    /// Stream one model reply. Text is forwarded and accumulated as it
    /// arrives; only the first tool call is kept.
    async fn round(
        &self,
        session: &mut ChatSession,
        messages: Vec<Message>,
        outcome: &mut LoopOutcome,
    ) -> Result<Round, String> {
        let started = Instant::now();
        let mut stream = session.send(messages).await.map_err(|e| e.to_string())?;

        let mut round = Round::default();
        let mut usage: Option<Usage> = None;

        while let Some(event) = stream.next().await {
            match event.map_err(|e| e.to_string())? {
                StreamEvent::Token { text } => {
                    if text.is_empty() {
                        continue;
                    }
                    round.text.push_str(&text);
                    outcome.text.push_str(&text);
                    self.send(LoopEvent::TextDelta(text)).await;
                }
                StreamEvent::ToolCallFinished {
                    call_id,
                    tool_name,
                    arguments,
                } => {
                    if round.call.is_some() {
                        tracing::debug!(tool = %tool_name, "extra tool call in round ignored");
                        outcome.dropped_tool_calls += 1;
                        continue;
                    }
                    round.call = Some(ToolCall {
                        call_id,
                        tool_name,
                        arguments,
                    });
                }
                StreamEvent::Done { usage: u, .. } => {
                    usage = u;
                    break;
                }
                StreamEvent::Error { message } => return Err(message),
                StreamEvent::ToolCallStarted { .. } | StreamEvent::ToolCallDelta { .. } => {}
            }
        }

        TraceEvent::LlmRequest {
            provider: session.provider_id().to_string(),
            model: session.model().unwrap_or("default").to_string(),
            purpose: "chat".into(),
            streaming: true,
            duration_ms: started.elapsed().as_millis() as u64,
            prompt_tokens: usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: usage.as_ref().map(|u| u.completion_tokens),
        }
        .emit();

        Ok(round)
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        match ToolKind::from_name(&call.tool_name) {
            Some(kind) => kind.execute(&call.arguments, self.tools).await,
            None => {
                tracing::warn!(tool = %call.tool_name, "model called an unknown tool");
                ToolResult::empty(format!("Unknown tool: {}", call.tool_name))
            }
        }
    }

    async fn send(&self, event: LoopEvent) {
        // A gone receiver means the client disconnected; keep going.
        let _ = self.tx.send(event).await;
    }
}

#[derive(Default)]
struct Round {
    text: String,
    call: Option<ToolCall>,
}
