//! Day-boundary archival: completed UTC days leave the live log and survive
//! only as a [`Snapshot`] summary.
//!
//! Turns without a timestamp and turns from the current day are always kept.
//! A day that already has a snapshot is dropped without being summarized
//! again, so running archival twice is the same as running it once.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use pr_domain::config::ArchivalConfig;
use pr_domain::error::{Error, Result};
use pr_domain::payload;
use pr_domain::text::{normalize_whitespace, truncate_chars};
use pr_domain::trace::TraceEvent;

use crate::model::{day_key, Session, Snapshot, Turn, TurnRole};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Summarizer capability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Best-effort day summarization. Failures fall back to
/// [`fallback_summary`].
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize_day(&self, day: &str, transcript: &str) -> Result<String>;
}

/// A summarizer that is never available; every day gets the fallback.
pub struct NoSummarizer;

#[async_trait::async_trait]
impl Summarizer for NoSummarizer {
    async fn summarize_day(&self, _day: &str, _transcript: &str) -> Result<String> {
        Err(Error::Other("no summarizer configured".into()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Partitioning
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A session's turns split by archival eligibility.
#[derive(Debug, Default)]
pub struct DayPartition {
    /// Undated turns and turns from today (or later), in original order.
    pub keep: Vec<Turn>,
    /// Turns from strictly earlier days, grouped by day key.
    pub stale: BTreeMap<String, Vec<Turn>>,
}

pub fn partition(turns: &[Turn], today: &str) -> DayPartition {
    let mut out = DayPartition::default();
    for turn in turns {
        match turn.day_key() {
            Some(day) if day.as_str() < today => {
                out.stale.entry(day).or_default().push(turn.clone());
            }
            _ => out.keep.push(turn.clone()),
        }
    }
    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Summary text
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `Role: text` lines with payloads stripped and whitespace collapsed,
/// capped at `max_chars`.
pub fn build_day_transcript(turns: &[Turn], max_chars: usize) -> String {
    let mut buf = String::new();
    for turn in turns {
        let text = normalize_whitespace(&payload::strip(&turn.text()));
        if text.is_empty() {
            continue;
        }
        if !buf.is_empty() {
            buf.push('\n');
        }
        buf.push_str(turn.role.label());
        buf.push_str(": ");
        buf.push_str(&text);
    }
    truncate_chars(&buf, max_chars)
}

/// Deterministic summary from the day's first user message, last user
/// message and last assistant message.
pub fn fallback_summary(turns: &[Turn], snippet_chars: usize, max_chars: usize) -> String {
    let snippet = |t: &Turn| truncate_chars(&normalize_whitespace(&payload::strip(&t.text())), snippet_chars);

    let users: Vec<&Turn> = turns.iter().filter(|t| t.role == TurnRole::User).collect();
    let last_assistant = turns.iter().rev().find(|t| t.role == TurnRole::Assistant);

    let mut pieces = Vec::new();
    if let Some(first) = users.first() {
        pieces.push(format!("Started with: {}", snippet(first)));
    }
    if users.len() > 1 {
        if let Some(last) = users.last() {
            pieces.push(format!("Last asked: {}", snippet(last)));
        }
    }
    if let Some(answer) = last_assistant {
        pieces.push(format!("Last answer: {}", snippet(answer)));
    }

    if pieces.is_empty() {
        return format!("{} messages.", turns.len());
    }
    truncate_chars(&pieces.join(" | "), max_chars)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Archival pass
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What an archival pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub new_snapshots: Vec<Snapshot>,
    /// Every day whose turns left the live log, including days that
    /// already had a snapshot.
    pub archived_days: BTreeSet<String>,
    pub dropped_turns: usize,
}

impl ArchiveOutcome {
    pub fn is_empty(&self) -> bool {
        self.archived_days.is_empty()
    }
}

/// Summarize the stale days of `session` without mutating it.
pub async fn plan_archive(
    session: &Session,
    summarizer: &dyn Summarizer,
    cfg: &ArchivalConfig,
    now: DateTime<Utc>,
) -> ArchiveOutcome {
    let today = day_key(now);
    let parts = partition(&session.turns, &today);
    let mut outcome = ArchiveOutcome::default();

    for (day, turns) in parts.stale {
        outcome.dropped_turns += turns.len();
        outcome.archived_days.insert(day.clone());
        if session.has_snapshot(&day) {
            continue;
        }

        let transcript = build_day_transcript(&turns, cfg.transcript_max_chars);
        let (summary, by_model) = match summarizer.summarize_day(&day, &transcript).await {
            Ok(s) if !s.trim().is_empty() => {
                (truncate_chars(s.trim(), cfg.summary_max_chars), true)
            }
            Ok(_) => (
                fallback_summary(&turns, cfg.snippet_chars, cfg.summary_max_chars),
                false,
            ),
            Err(e) => {
                tracing::debug!(day = %day, error = %e, "day summarization failed, using fallback");
                (
                    fallback_summary(&turns, cfg.snippet_chars, cfg.summary_max_chars),
                    false,
                )
            }
        };

        TraceEvent::DayArchived {
            session_id: session.id.clone(),
            day: day.clone(),
            message_count: turns.len(),
            summarized_by_model: by_model,
        }
        .emit();

        outcome.new_snapshots.push(Snapshot {
            date: day,
            summary,
            message_count: turns.len(),
            created_at: now,
        });
    }

    outcome
}

/// Apply a planned archive: drop every turn dated on an archived day and
/// add snapshots for days that do not have one yet.
pub fn apply_archive(session: &mut Session, outcome: &ArchiveOutcome) {
    if outcome.is_empty() {
        return;
    }
    session.turns.retain(|t| match t.day_key() {
        Some(day) => !outcome.archived_days.contains(&day),
        None => true,
    });
    for snap in &outcome.new_snapshots {
        if !session.has_snapshot(&snap.date) {
            session.snapshots.push(snap.clone());
        }
    }
    session.snapshots.sort_by(|a, b| a.date.cmp(&b.date));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
