use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider system
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Request timeout applied to every provider HTTP call.
    #[serde(default = "d_60000u")]
    pub default_timeout_ms: u64,
    /// Sampling temperature for the main chat model.
    #[serde(default = "d_temp_chat")]
    pub temperature: f32,
    /// Model driving the conversation and tool calls. Format:
    /// `"provider_id/model_name"` or just `"provider_id"`.
    #[serde(default)]
    pub chat_model: Option<String>,
    /// Model used for entity/intent classification.
    #[serde(default)]
    pub classifier_model: Option<String>,
    /// Model used for titles and day summaries.
    #[serde(default)]
    pub summarizer_model: Option<String>,
    /// Registered LLM providers.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: d_60000u(),
            temperature: d_temp_chat(),
            chat_model: None,
            classifier_model: None,
            summarizer_model: None,
            providers: Vec::new(),
        }
    }
}

/// The model roles the orchestrator asks the registry for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    Chat,
    Classifier,
    Summarizer,
}

impl ModelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelRole::Chat => "chat",
            ModelRole::Classifier => "classifier",
            ModelRole::Summarizer => "summarizer",
        }
    }
}

impl LlmConfig {
    /// The configured `provider_id/model` spec for a role, if any.
    pub fn spec_for(&self, role: ModelRole) -> Option<&str> {
        match role {
            ModelRole::Chat => self.chat_model.as_deref(),
            ModelRole::Classifier => self.classifier_model.as_deref(),
            ModelRole::Summarizer => self.summarizer_model.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    #[serde(default)]
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Any endpoint speaking the OpenAI chat completions contract
    /// (OpenAI, Gemini's OpenAI-compatible endpoint, Ollama, vLLM, ...).
    #[default]
    OpenaiCompat,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Header name (default `"Authorization"`).
    #[serde(default)]
    pub header: Option<String>,
    /// Header value prefix (default `"Bearer "`).
    #[serde(default)]
    pub prefix: Option<String>,
    /// Env var containing the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Direct key (for config-only setups; prefer `env`).
    #[serde(default)]
    pub key: Option<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_60000u() -> u64 {
    60_000
}
fn d_temp_chat() -> f32 {
    0.7
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_defaults_to_openai_compat() {
        let toml_str = r#"
            [[providers]]
            id = "gemini"
            base_url = "https://generativelanguage.googleapis.com/v1beta/openai"
            default_model = "gemini-2.5-flash"

            [providers.auth]
            env = "GEMINI_API_KEY"
        "#;
        let cfg: LlmConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.providers.len(), 1);
        assert_eq!(cfg.providers[0].kind, ProviderKind::OpenaiCompat);
        assert_eq!(cfg.providers[0].auth.env.as_deref(), Some("GEMINI_API_KEY"));
    }

    #[test]
    fn spec_for_returns_role_specific_model() {
        let cfg = LlmConfig {
            chat_model: Some("gemini/gemini-2.5-flash".into()),
            classifier_model: Some("gemini/gemini-2.0-flash".into()),
            ..Default::default()
        };
        assert_eq!(cfg.spec_for(ModelRole::Chat), Some("gemini/gemini-2.5-flash"));
        assert_eq!(cfg.spec_for(ModelRole::Classifier), Some("gemini/gemini-2.0-flash"));
        assert_eq!(cfg.spec_for(ModelRole::Summarizer), None);
    }
}
