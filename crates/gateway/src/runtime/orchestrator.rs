//! Per-request orchestration: session, archival, resolution, framing, the
//! tool loop, persistence and first-turn metadata, in that order.

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use pr_domain::config::ModelRole;
use pr_domain::intent::{ChatMode, IntentCategory, ResolvedIntent, SymbolSource};
use pr_domain::payload;
use pr_domain::text::truncate_chars;
use pr_domain::tool::Message;
use pr_domain::trace::TraceEvent;
use pr_providers::ChatSession;
use pr_sessions::{Session, Turn, TurnRole};
use pr_tools::report::master_report;
use pr_tools::ToolKind;

use crate::runtime::prompt::{build_system_prompt, EntityFrame, PromptInputs, Stance};
use crate::runtime::tool_loop::{LoopEvent, LoopOutcome, ToolLoop};
use crate::state::AppState;

const EVENT_BUFFER: usize = 64;

/// One inbound chat message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatInput {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, alias = "stock_symbol")]
    pub entity_symbol: Option<String>,
    #[serde(default)]
    pub mode: ChatMode,
    #[serde(default)]
    pub profile: Option<String>,
}

/// A running chat request.
pub struct ChatTurn {
    /// Known before any model call so transports can announce it up front.
    pub session_id: String,
    pub events: mpsc::Receiver<LoopEvent>,
    /// Resolves once the turn is persisted. Dropping it does not cancel.
    pub handle: JoinHandle<LoopOutcome>,
}

/// The symbol the request is framed around, and how strongly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEntity {
    pub symbol: String,
    pub secondary: Option<String>,
    pub stance: Stance,
}

/// Decide which symbol drives the framing.
///
/// A caller-pinned symbol in entity mode always wins and is enforced. A
/// symbol the classifier read from this message is enforced. A carried-over
/// symbol, or a caller symbol outside entity mode, is only contextual.
pub fn choose_entity(
    mode: ChatMode,
    caller_symbol: Option<&str>,
    resolved: &ResolvedIntent,
) -> Option<ActiveEntity> {
    let caller = caller_symbol
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty());

    if let (ChatMode::Entity, Some(symbol)) = (mode, caller.as_ref()) {
        let secondary = match resolved.intent_category {
            IntentCategory::Comparison => resolved
                .entity_symbol
                .iter()
                .chain(resolved.secondary_symbol.iter())
                .find(|s| *s != symbol)
                .cloned(),
            _ => None,
        };
        return Some(ActiveEntity {
            symbol: symbol.clone(),
            secondary,
            stance: Stance::Enforced,
        });
    }

    match (&resolved.entity_symbol, resolved.source) {
        (Some(symbol), SymbolSource::Classifier) => Some(ActiveEntity {
            symbol: symbol.clone(),
            secondary: resolved.secondary_symbol.clone(),
            stance: Stance::Enforced,
        }),
        (Some(symbol), _) => Some(ActiveEntity {
            symbol: symbol.clone(),
            secondary: resolved.secondary_symbol.clone(),
            stance: Stance::Contextual,
        }),
        (None, _) => caller.map(|symbol| ActiveEntity {
            symbol,
            secondary: None,
            stance: Stance::Contextual,
        }),
    }
}

/// Start a chat request. The session is resolved before returning; the
/// rest runs on a spawned task feeding `events`.
pub async fn run_chat(state: AppState, input: ChatInput) -> ChatTurn {
    let (session, _is_new) = state
        .sessions
        .load_or_create(input.session_id.as_deref())
        .await;
    let session_id = session.id.clone();

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let handle = tokio::spawn(run_chat_inner(state, session_id.clone(), input, tx));

    ChatTurn {
        session_id,
        events: rx,
        handle,
    }
}

async fn run_chat_inner(
    state: AppState,
    session_id: String,
    input: ChatInput,
    tx: mpsc::Sender<LoopEvent>,
) -> LoopOutcome {
    let _permit = match state.session_locks.acquire(&session_id).await {
        Ok(permit) => Some(permit),
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "running without session lock");
            None
        }
    };

    let now = Utc::now();
    if let Err(e) = state
        .sessions
        .archive_stale_days(&session_id, state.summarizer.as_ref(), now)
        .await
    {
        tracing::warn!(session_id = %session_id, error = %e, "archival skipped");
    }

    let session = state
        .sessions
        .get(&session_id)
        .unwrap_or_else(|| Session::new(session_id.clone(), "", now));
    let first_turn = session.turns.is_empty() && session.snapshots.is_empty();

    // Resolution
    let resolver_history: &[Turn] = match input.mode {
        ChatMode::Overall => &[],
        ChatMode::Entity => &session.turns,
    };
    let resolved = state.resolver.resolve(&input.message, resolver_history).await;
    let active = choose_entity(input.mode, input.entity_symbol.as_deref(), &resolved);

    TraceEvent::IntentResolved {
        session_id: session_id.clone(),
        symbol: active.as_ref().map(|a| a.symbol.clone()),
        secondary_symbol: active.as_ref().and_then(|a| a.secondary.clone()),
        intent: resolved.intent_category.as_str().into(),
        source: format!("{:?}", resolved.source).to_lowercase(),
        enforced: active.as_ref().is_some_and(|a| a.stance == Stance::Enforced),
    }
    .emit();

    // Framing
    let report = match &active {
        Some(a) => {
            let snapshot = state.tools.data.snapshot(&a.symbol).await;
            master_report(&a.symbol, snapshot.as_deref())
        }
        None => String::new(),
    };
    let system = build_system_prompt(&PromptInputs {
        entity: active.as_ref().map(|a| EntityFrame {
            symbol: &a.symbol,
            stance: a.stance,
            report: &report,
            secondary: a.secondary.as_deref(),
        }),
        intent: resolved.intent_category,
        snapshots: &session.snapshots,
        profile: input.profile.as_deref(),
        today: now.date_naive(),
    });

    let mut opening = Vec::with_capacity(session.turns.len() + 2);
    opening.push(Message::system(system));
    opening.extend(replay_history(&session.turns));
    opening.push(Message::user(input.message.clone()));

    // Tool loop
    let outcome = match state.llm.for_role(ModelRole::Chat) {
        Some(binding) => {
            let mut chat = ChatSession::new(binding)
                .with_tools(ToolKind::definitions())
                .with_temperature(state.config.llm.temperature);
            ToolLoop::new(&state.tools, state.config.tool_loop.max_rounds, tx)
                .run(&mut chat, opening)
                .await
        }
        None => {
            tracing::error!("no chat provider configured");
            let _ = tx
                .send(LoopEvent::TextDelta(
                    "Error details: no chat model is configured.".into(),
                ))
                .await;
            LoopOutcome {
                failed: true,
                ..LoopOutcome::default()
            }
        }
    };

    // Persistence
    let done_at = Utc::now();
    let mut turns = vec![Turn::user(input.message.clone(), now)];
    if !outcome.text.is_empty() {
        turns.push(Turn::assistant(outcome.text.clone(), done_at));
    }
    if let Err(e) = state.sessions.append_turns(&session_id, turns).await {
        tracing::warn!(session_id = %session_id, error = %e, "turns not persisted");
    }

    if first_turn {
        let cfg = &state.config.sessions;
        let title = state
            .summarizer
            .generate_title(&input.message, cfg.title_max_chars)
            .await;
        let preview = truncate_chars(input.message.trim(), cfg.preview_chars);
        if let Err(e) = state
            .sessions
            .set_metadata(&session_id, Some(title), Some(preview))
            .await
        {
            tracing::warn!(session_id = %session_id, error = %e, "title not persisted");
        }
    }

    state.session_locks.prune_idle();
    outcome
}

/// Prior turns as chat messages, display payloads removed.
fn replay_history(turns: &[Turn]) -> Vec<Message> {
    turns
        .iter()
        .filter_map(|t| {
            let text = payload::strip(&t.text());
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(match t.role {
                TurnRole::User => Message::user(text),
                TurnRole::Assistant => Message::assistant(text),
            })
        })
        .collect()
}

/// Drain a turn into one string. Used by the CLI and tests.
pub async fn collect(mut turn: ChatTurn) -> (String, Option<LoopOutcome>) {
    let mut text = String::new();
    while let Some(event) = turn.events.recv().await {
        text.push_str(&event.into_content());
    }
    let outcome = turn.handle.await.ok();
    (text, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(symbol: Option<&str>, source: SymbolSource, intent: IntentCategory) -> ResolvedIntent {
        ResolvedIntent {
            entity_symbol: symbol.map(String::from),
            secondary_symbol: None,
            intent_category: intent,
            is_enforced: source == SymbolSource::Classifier,
            source,
        }
    }

    #[test]
    fn caller_symbol_in_entity_mode_is_enforced() {
        let r = resolved(Some("INFY"), SymbolSource::Classifier, IntentCategory::Risk);
        let a = choose_entity(ChatMode::Entity, Some(" tcs "), &r).unwrap();
        assert_eq!(a.symbol, "TCS");
        assert_eq!(a.stance, Stance::Enforced);
        assert_eq!(a.secondary, None);
    }

    #[test]
    fn comparison_pairs_caller_symbol_with_resolved_one() {
        let r = resolved(Some("INFY"), SymbolSource::Classifier, IntentCategory::Comparison);
        let a = choose_entity(ChatMode::Entity, Some("TCS"), &r).unwrap();
        assert_eq!(a.secondary.as_deref(), Some("INFY"));

        let r = resolved(Some("TCS"), SymbolSource::Classifier, IntentCategory::Comparison);
        let a = choose_entity(ChatMode::Entity, Some("TCS"), &r).unwrap();
        assert_eq!(a.secondary, None);
    }

    #[test]
    fn carried_over_symbol_is_contextual() {
        let r = resolved(Some("TCS"), SymbolSource::Sticky, IntentCategory::Future);
        let a = choose_entity(ChatMode::Entity, None, &r).unwrap();
        assert_eq!(a.stance, Stance::Contextual);

        let r = resolved(Some("TCS"), SymbolSource::Classifier, IntentCategory::Future);
        let a = choose_entity(ChatMode::Entity, None, &r).unwrap();
        assert_eq!(a.stance, Stance::Enforced);
    }

    #[test]
    fn overall_mode_demotes_caller_symbol() {
        let r = ResolvedIntent::empty();
        let a = choose_entity(ChatMode::Overall, Some("TCS"), &r).unwrap();
        assert_eq!(a.stance, Stance::Contextual);
        assert!(choose_entity(ChatMode::Overall, None, &r).is_none());
        assert!(choose_entity(ChatMode::Entity, Some("  "), &r).is_none());
    }

    #[test]
    fn replay_strips_payloads_and_drops_empty_turns() {
        let now = Utc::now();
        let turns = vec![
            Turn::user("risk of TCS?", now),
            Turn::assistant(r#"[RISK:{"score":40}]"#, now),
            Turn::assistant(r#"Moderate. [RISK:{"score":40}]"#, now),
        ];
        let msgs = replay_history(&turns);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].content.text(), Some("Moderate."));
    }

    #[test]
    fn stock_symbol_alias_is_accepted() {
        let input: ChatInput =
            serde_json::from_str(r#"{"message":"hi","stock_symbol":"TCS","mode":"overall"}"#).unwrap();
        assert_eq!(input.entity_symbol.as_deref(), Some("TCS"));
        assert_eq!(input.mode, ChatMode::Overall);
    }
}
