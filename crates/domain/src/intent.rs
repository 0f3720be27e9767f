//! Entity/intent model shared by the resolver, the orchestrator and the
//! tools.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intent category
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What the user is asking about the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntentCategory {
    Risk,
    Chart,
    Future,
    Sentiment,
    Analysis,
    Comparison,
    #[default]
    General,
}

impl IntentCategory {
    pub const ALL: [IntentCategory; 7] = [
        IntentCategory::Risk,
        IntentCategory::Chart,
        IntentCategory::Future,
        IntentCategory::Sentiment,
        IntentCategory::Analysis,
        IntentCategory::Comparison,
        IntentCategory::General,
    ];

    /// Lenient parse of a classifier label. Unknown labels map to `General`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "risk" => Self::Risk,
            "chart" | "graph" => Self::Chart,
            "future" | "outlook" => Self::Future,
            "sentiment" | "news" => Self::Sentiment,
            "analysis" => Self::Analysis,
            "comparison" | "compare" => Self::Comparison,
            _ => Self::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Risk => "risk",
            Self::Chart => "chart",
            Self::Future => "future",
            Self::Sentiment => "sentiment",
            Self::Analysis => "analysis",
            Self::Comparison => "comparison",
            Self::General => "general",
        }
    }

    /// Every category except `General` is entity-specific.
    pub fn is_analytic(&self) -> bool {
        !matches!(self, Self::General)
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resolution result
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the resolved symbol came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolSource {
    /// Named by the classifier for this message.
    Classifier,
    /// Carried over from recent turns.
    Sticky,
    /// Carried over because the classifier call failed.
    Degraded,
    /// Nothing found.
    None,
}

/// Output of entity/intent resolution for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIntent {
    pub entity_symbol: Option<String>,
    /// Second entity, populated for comparison intents.
    pub secondary_symbol: Option<String>,
    pub intent_category: IntentCategory,
    /// Whether the symbol must drive the system framing rather than being
    /// merely contextual.
    pub is_enforced: bool,
    pub source: SymbolSource,
}

impl ResolvedIntent {
    pub fn empty() -> Self {
        Self {
            entity_symbol: None,
            secondary_symbol: None,
            intent_category: IntentCategory::General,
            is_enforced: false,
            source: SymbolSource::None,
        }
    }
}

impl Default for ResolvedIntent {
    fn default() -> Self {
        Self::empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat mode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Caller-declared framing for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Market-wide questions; history is not used for entity resolution.
    Overall,
    /// The caller has pinned an entity.
    #[default]
    Entity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_label_maps_aliases_and_unknowns() {
        assert_eq!(IntentCategory::from_label("Compare"), IntentCategory::Comparison);
        assert_eq!(IntentCategory::from_label(" RISK "), IntentCategory::Risk);
        assert_eq!(IntentCategory::from_label("weather"), IntentCategory::General);
        assert_eq!(IntentCategory::from_label(""), IntentCategory::General);
    }

    #[test]
    fn only_general_is_not_analytic() {
        let analytic: Vec<_> = IntentCategory::ALL
            .iter()
            .filter(|c| !c.is_analytic())
            .collect();
        assert_eq!(analytic, vec![&IntentCategory::General]);
    }

    #[test]
    fn chat_mode_deserializes_lowercase() {
        let mode: ChatMode = serde_json::from_str("\"overall\"").unwrap();
        assert_eq!(mode, ChatMode::Overall);
    }
}
