//! Stored session document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Day keys are UTC calendar dates.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

pub fn day_key(at: DateTime<Utc>) -> String {
    at.format(DAY_KEY_FORMAT).to_string()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turns
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    /// Older documents call the assistant `model`.
    #[serde(alias = "model")]
    Assistant,
}

impl TurnRole {
    pub fn label(&self) -> &'static str {
        match self {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPart {
    pub text: String,
}

/// One message in the live log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub parts: Vec<TurnPart>,
    /// Turns without a timestamp are never archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Turn {
    pub fn new(role: TurnRole, text: impl Into<String>, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            role,
            parts: vec![TurnPart { text: text.into() }],
            created_at,
        }
    }

    pub fn user(text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(TurnRole::User, text, Some(at))
    }

    pub fn assistant(text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(TurnRole::Assistant, text, Some(at))
    }

    /// All parts joined with newlines.
    pub fn text(&self) -> String {
        match self.parts.as_slice() {
            [single] => single.text.clone(),
            parts => parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn day_key(&self) -> Option<String> {
        self.created_at.map(day_key)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Snapshots
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The surviving record of an archived day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Day key (`YYYY-MM-DD`, UTC).
    pub date: String,
    pub summary: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub preview: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Stored as `messages` for compatibility with existing documents.
    #[serde(default, rename = "messages")]
    pub turns: Vec<Turn>,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
}

impl Session {
    pub fn new(id: impl Into<String>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            preview: String::new(),
            created_at: now,
            updated_at: now,
            turns: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    pub fn has_snapshot(&self, day: &str) -> bool {
        self.snapshots.iter().any(|s| s.date == day)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            preview: self.preview.clone(),
            updated_at: self.updated_at,
            timestamp: self.created_at,
        }
    }
}

/// The most recent `n` turns, oldest first.
pub fn recent_turns(turns: &[Turn], n: usize) -> &[Turn] {
    &turns[turns.len().saturating_sub(n)..]
}

/// Listing row for the sessions API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub updated_at: DateTime<Utc>,
    /// Creation time; older clients sort on this.
    pub timestamp: DateTime<Utc>,
}
