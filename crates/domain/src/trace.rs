use serde::Serialize;

/// Structured trace events emitted across all Prysm crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    IntentResolved {
        session_id: String,
        symbol: Option<String>,
        secondary_symbol: Option<String>,
        intent: String,
        source: String,
        enforced: bool,
    },
    LlmRequest {
        provider: String,
        model: String,
        purpose: String,
        streaming: bool,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    ToolExecuted {
        tool: String,
        symbol: Option<String>,
        has_payload: bool,
        duration_ms: u64,
    },
    ToolLoopFinished {
        rounds: usize,
        tool_calls: usize,
        dropped_tool_calls: usize,
        text_chars: usize,
        failed: bool,
    },
    SessionResolved {
        session_id: String,
        is_new: bool,
    },
    TurnsAppended {
        session_id: String,
        turns: usize,
    },
    DayArchived {
        session_id: String,
        day: String,
        message_count: usize,
        summarized_by_model: bool,
    },
    StoreDegraded {
        session_id: String,
        reason: String,
    },
    EntityDataFetched {
        symbol: String,
        cache_hit: bool,
        found: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "pr_event");
    }
}
