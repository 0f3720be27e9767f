//! Provider registry.
//!
//! Constructs and holds all configured LLM provider instances. At startup the
//! registry reads the [`LlmConfig`], resolves authentication (env vars, direct
//! keys), and instantiates an adapter for each configured provider.

use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use pr_domain::config::{LlmConfig, ModelRole, ProviderKind};
use pr_domain::error::Result;
use std::collections::HashMap;
use std::sync::Arc;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider plus the model override a role asked for.
#[derive(Clone)]
pub struct RoleBinding {
    pub provider: Arc<dyn LlmProvider>,
    /// `None` means the provider's default model.
    pub model: Option<String>,
}

/// Holds all instantiated LLM providers and role assignments.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    roles: HashMap<ModelRole, String>,
}

impl ProviderRegistry {
    /// Build the registry from the application's [`LlmConfig`].
    ///
    /// Providers that fail to initialize (usually a missing API key) are
    /// logged and skipped rather than aborting startup; the orchestrator
    /// reports a diagnostic on each request instead.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut registry = Self::default();

        for pc in &config.providers {
            let result: Result<Arc<dyn LlmProvider>> = match pc.kind {
                ProviderKind::OpenaiCompat => {
                    OpenAiCompatProvider::from_config(pc, config.default_timeout_ms)
                        .map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
                }
            };

            match result {
                Ok(provider) => {
                    tracing::info!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        "registered LLM provider"
                    );
                    registry.providers.insert(pc.id.clone(), provider);
                }
                Err(e) => {
                    tracing::warn!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        error = %e,
                        "failed to initialize LLM provider, skipping"
                    );
                }
            }
        }

        if registry.providers.is_empty() {
            tracing::warn!(
                "no LLM providers initialized; chat requests will return a diagnostic \
                 until auth is configured"
            );
        }

        for role in [ModelRole::Chat, ModelRole::Classifier, ModelRole::Summarizer] {
            if let Some(spec) = config.spec_for(role) {
                registry.roles.insert(role, spec.to_string());
            }
        }

        Ok(registry)
    }

    /// Register a provider directly (tests, embedding).
    pub fn insert(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers
            .insert(provider.provider_id().to_string(), provider);
    }

    /// Assign a role to a `provider_id/model` spec.
    pub fn assign(&mut self, role: ModelRole, spec: impl Into<String>) {
        self.roles.insert(role, spec.into());
    }

    /// Look up a provider by its config id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// Resolve the provider and model for a role.
    ///
    /// Unassigned roles fall back to the chat role, and an unassigned chat
    /// role falls back to the first registered provider (by id) with its
    /// default model.
    pub fn for_role(&self, role: ModelRole) -> Option<RoleBinding> {
        let spec = self
            .roles
            .get(&role)
            .or_else(|| self.roles.get(&ModelRole::Chat));

        match spec {
            Some(spec) => {
                let (provider_id, model) = match spec.split_once('/') {
                    Some((p, m)) => (p, Some(m.to_string())),
                    None => (spec.as_str(), None),
                };
                let provider = self.providers.get(provider_id).cloned()?;
                Some(RoleBinding { provider, model })
            }
            None => {
                let first = self.list_providers().into_iter().next()?;
                let provider = self.providers.get(&first).cloned()?;
                Some(RoleBinding {
                    provider,
                    model: None,
                })
            }
        }
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// List all registered provider IDs (sorted).
    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedProvider;

    fn registry_with(ids: &[&str]) -> ProviderRegistry {
        let mut reg = ProviderRegistry::default();
        for id in ids {
            reg.insert(Arc::new(ScriptedProvider::new(*id)));
        }
        reg
    }

    #[test]
    fn role_spec_splits_provider_and_model() {
        let mut reg = registry_with(&["gemini"]);
        reg.assign(ModelRole::Classifier, "gemini/gemini-2.0-flash");
        let binding = reg.for_role(ModelRole::Classifier).unwrap();
        assert_eq!(binding.provider.provider_id(), "gemini");
        assert_eq!(binding.model.as_deref(), Some("gemini-2.0-flash"));
    }

    #[test]
    fn unassigned_role_falls_back_to_chat() {
        let mut reg = registry_with(&["a", "b"]);
        reg.assign(ModelRole::Chat, "b");
        let binding = reg.for_role(ModelRole::Summarizer).unwrap();
        assert_eq!(binding.provider.provider_id(), "b");
        assert!(binding.model.is_none());
    }

    #[test]
    fn no_roles_uses_first_provider_by_id() {
        let reg = registry_with(&["zeta", "alpha"]);
        let binding = reg.for_role(ModelRole::Chat).unwrap();
        assert_eq!(binding.provider.provider_id(), "alpha");
    }

    #[test]
    fn role_pointing_at_missing_provider_is_none() {
        let mut reg = registry_with(&["a"]);
        reg.assign(ModelRole::Chat, "ghost/model");
        assert!(reg.for_role(ModelRole::Chat).is_none());
    }

    #[test]
    fn empty_config_builds_empty_registry() {
        let reg = ProviderRegistry::from_config(&LlmConfig::default()).unwrap();
        assert!(reg.is_empty());
        assert!(reg.for_role(ModelRole::Chat).is_none());
    }
}
