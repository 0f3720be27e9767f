use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Directory holding one JSON document per session.
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
    /// Title given to a session before its first exchange.
    #[serde(default = "d_default_title")]
    pub default_title: String,
    /// Preview is the first user message truncated to this many chars.
    #[serde(default = "d_50")]
    pub preview_chars: usize,
    /// Generated titles are capped at this many chars.
    #[serde(default = "d_60")]
    pub title_max_chars: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            state_path: d_state_path(),
            default_title: d_default_title(),
            preview_chars: d_50(),
            title_max_chars: d_60(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Day archival
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Moves completed UTC days out of the live log into per-day snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivalConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Day transcripts fed to the summarizer are capped at this size.
    #[serde(default = "d_4000")]
    pub transcript_max_chars: usize,
    /// Stored summaries are capped at this size.
    #[serde(default = "d_600")]
    pub summary_max_chars: usize,
    /// Per-message snippet length in the fallback summary.
    #[serde(default = "d_160")]
    pub snippet_chars: usize,
}

impl Default for ArchivalConfig {
    fn default() -> Self {
        Self {
            enabled: d_true(),
            transcript_max_chars: d_4000(),
            summary_max_chars: d_600(),
            snippet_chars: d_160(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_state_path() -> PathBuf {
    PathBuf::from("./data/sessions")
}
fn d_default_title() -> String {
    "New Chat".into()
}
fn d_50() -> usize {
    50
}
fn d_60() -> usize {
    60
}
fn d_true() -> bool {
    true
}
fn d_4000() -> usize {
    4000
}
fn d_600() -> usize {
    600
}
fn d_160() -> usize {
    160
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
