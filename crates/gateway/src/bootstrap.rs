//! AppState construction shared by `serve` and `ask`, so both boot the same
//! runtime with or without an HTTP listener.

use std::sync::Arc;

use anyhow::Context;

use pr_domain::config::{Config, ConfigSeverity, ModelRole};
use pr_providers::ProviderRegistry;
use pr_sessions::SessionStore;
use pr_tools::data::build_data_provider;
use pr_tools::{HeadlineClassifier, KnowledgeBase, ToolContext};

use crate::runtime::session_lock::SessionLockMap;
use crate::runtime::{EntityResolver, LlmSummarizer};
use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── LLM providers ────────────────────────────────────────────────
    let llm = Arc::new(
        ProviderRegistry::from_config(&config.llm).context("initializing LLM providers")?,
    );
    if llm.is_empty() {
        tracing::info!("no LLM providers initialized; chat requests will return a diagnostic");
    } else {
        tracing::info!(
            providers = ?llm.list_providers(),
            "LLM provider registry ready"
        );
    }

    // ── Sessions ─────────────────────────────────────────────────────
    let sessions = Arc::new(SessionStore::open(&config.sessions, &config.archival));
    tracing::info!(
        sessions = sessions.len(),
        durable = sessions.is_durable(),
        archival = config.archival.enabled,
        "session store ready"
    );
    let session_locks = Arc::new(SessionLockMap::new());

    // ── Tools and entity data ────────────────────────────────────────
    let summarizer = Arc::new(LlmSummarizer::new(llm.for_role(ModelRole::Summarizer)));
    let headlines = summarizer
        .is_available()
        .then(|| summarizer.clone() as Arc<dyn HeadlineClassifier>);
    let data = build_data_provider(&config.data).context("initializing entity data provider")?;
    let tools = Arc::new(ToolContext {
        data,
        knowledge: KnowledgeBase::new(&config.knowledge),
        headlines,
    });
    tracing::info!(
        base_url = config.data.base_url.as_deref().unwrap_or("(none)"),
        cache_ttl_secs = config.data.cache_ttl_secs,
        "entity data provider ready"
    );

    // ── Resolver and summarizer ──────────────────────────────────────
    let resolver = Arc::new(
        EntityResolver::new(llm.for_role(ModelRole::Classifier), &config.resolver)
            .context("building entity resolver")?,
    );
    tracing::info!(
        classifier = resolver.has_classifier(),
        summarizer = summarizer.is_available(),
        "entity resolver ready"
    );

    Ok(AppState {
        config,
        llm,
        sessions,
        session_locks,
        tools,
        resolver,
        summarizer,
    })
}
