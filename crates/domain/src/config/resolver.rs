use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Entity resolver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// How many recent turns are scanned for a sticky symbol.
    #[serde(default = "d_10")]
    pub history_window: usize,
    /// How many recent turns are shown to the classifier.
    #[serde(default = "d_3")]
    pub classifier_history_turns: usize,
    /// Each classifier history turn is truncated to this many chars.
    #[serde(default = "d_100")]
    pub classifier_turn_chars: usize,
    /// Messages shorter than this are treated as follow-ups even without
    /// a cue word.
    #[serde(default = "d_25")]
    pub short_message_chars: usize,
    /// Added to the built-in list of uppercase words never taken as symbols.
    #[serde(default)]
    pub extra_stop_words: Vec<String>,
    /// Added to the built-in list of placeholder symbols the classifier may
    /// echo back.
    #[serde(default)]
    pub extra_invalid_tokens: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            history_window: d_10(),
            classifier_history_turns: d_3(),
            classifier_turn_chars: d_100(),
            short_message_chars: d_25(),
            extra_stop_words: Vec::new(),
            extra_invalid_tokens: Vec::new(),
        }
    }
}

fn d_10() -> usize {
    10
}
fn d_3() -> usize {
    3
}
fn d_100() -> usize {
    100
}
fn d_25() -> usize {
    25
}
