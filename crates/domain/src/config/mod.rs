mod llm;
mod observability;
mod resolver;
mod server;
mod sessions;
mod tools;

pub use llm::*;
pub use observability::*;
pub use resolver::*;
pub use server::*;
pub use sessions::*;
pub use tools::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub tool_loop: ToolLoopConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub archival: ArchivalConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }

        if self.llm.providers.is_empty() {
            errors.push(ConfigError::warning(
                "llm.providers",
                "no LLM providers configured",
            ));
        }
        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError::error(
                    format!("llm.providers[{i}].id"),
                    "provider id must not be empty",
                ));
            }
            if provider.base_url.is_empty() {
                errors.push(ConfigError::error(
                    format!("llm.providers[{i}].base_url"),
                    "provider base_url must not be empty",
                ));
            }
        }

        // Role specs must point at a registered provider.
        for role in [ModelRole::Chat, ModelRole::Classifier, ModelRole::Summarizer] {
            let Some(spec) = self.llm.spec_for(role) else {
                continue;
            };
            let provider_id = spec.split('/').next().unwrap_or(spec);
            if !self.llm.providers.iter().any(|p| p.id == provider_id) {
                errors.push(ConfigError::error(
                    format!("llm.{}_model", role.as_str()),
                    format!("unknown provider \"{provider_id}\""),
                ));
            }
        }

        if self.tool_loop.max_rounds == 0 {
            errors.push(ConfigError::error(
                "tool_loop.max_rounds",
                "max_rounds must be at least 1",
            ));
        }
        if self.resolver.history_window == 0 {
            errors.push(ConfigError::warning(
                "resolver.history_window",
                "0 disables sticky symbol carry-over",
            ));
        }
        if self.archival.summary_max_chars == 0 {
            errors.push(ConfigError::error(
                "archival.summary_max_chars",
                "summary_max_chars must be greater than 0",
            ));
        }
        if self.data.base_url.is_none() {
            errors.push(ConfigError::warning(
                "data.base_url",
                "no entity data source configured; tools will report missing data",
            ));
        }

        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(id: &str) -> ProviderConfig {
        ProviderConfig {
            id: id.into(),
            kind: ProviderKind::OpenaiCompat,
            base_url: "https://api.example.com/v1".into(),
            auth: AuthConfig::default(),
            default_model: Some("m".into()),
        }
    }

    fn errors_only(cfg: &Config) -> Vec<ConfigError> {
        cfg.validate()
            .into_iter()
            .filter(|e| e.severity == ConfigSeverity::Error)
            .collect()
    }

    #[test]
    fn default_config_has_no_errors() {
        assert!(errors_only(&Config::default()).is_empty());
    }

    #[test]
    fn unknown_role_provider_is_an_error() {
        let mut cfg = Config::default();
        cfg.llm.providers.push(provider("gemini"));
        cfg.llm.classifier_model = Some("openai/gpt-4o-mini".into());
        let errs = errors_only(&cfg);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].field, "llm.classifier_model");
    }

    #[test]
    fn zero_rounds_rejected() {
        let mut cfg = Config::default();
        cfg.tool_loop.max_rounds = 0;
        let errs = errors_only(&cfg);
        assert!(errs.iter().any(|e| e.field == "tool_loop.max_rounds"));
    }

    #[test]
    fn display_format_matches_cli_output() {
        let e = ConfigError::warning("llm.providers", "no LLM providers configured");
        assert_eq!(e.to_string(), "[WARN] llm.providers: no LLM providers configured");
    }
}
