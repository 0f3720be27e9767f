#![allow(dead_code)]

use std::sync::Arc;

use pr_domain::config::{Config, KnowledgeConfig, ModelRole};
use pr_gateway::runtime::session_lock::SessionLockMap;
use pr_gateway::runtime::{EntityResolver, LlmSummarizer};
use pr_gateway::state::AppState;
use pr_providers::scripted::ScriptedProvider;
use pr_providers::{ProviderRegistry, RoleBinding};
use pr_sessions::SessionStore;
use pr_tools::data::{Fundamentals, StaticDataProvider};
use pr_tools::{EntitySnapshot, KnowledgeBase, ToolContext};

pub fn snapshot(symbol: &str, beta: f64) -> EntitySnapshot {
    EntitySnapshot {
        symbol: symbol.into(),
        fundamentals: Fundamentals {
            beta: Some(beta),
            trailing_pe: Some(28.4),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn tool_context() -> ToolContext {
    ToolContext {
        data: Arc::new(
            StaticDataProvider::new()
                .with(snapshot("TCS", 0.6))
                .with(snapshot("INFY", 1.3)),
        ),
        knowledge: KnowledgeBase::new(&KnowledgeConfig::default()),
        headlines: None,
    }
}

pub fn binding(provider: &Arc<ScriptedProvider>) -> RoleBinding {
    RoleBinding {
        provider: provider.clone(),
        model: None,
    }
}

/// A fully wired state over scripted providers and an in-memory store.
pub struct Harness {
    pub state: AppState,
    pub chat: Arc<ScriptedProvider>,
    pub classifier: Arc<ScriptedProvider>,
    pub summarizer: Arc<ScriptedProvider>,
}

pub fn harness(
    chat: ScriptedProvider,
    classifier: ScriptedProvider,
    summarizer: ScriptedProvider,
) -> Harness {
    let config = Config::default();
    let chat = Arc::new(chat);
    let classifier = Arc::new(classifier);
    let summarizer = Arc::new(summarizer);

    let mut llm = ProviderRegistry::default();
    llm.insert(chat.clone());
    llm.insert(classifier.clone());
    llm.insert(summarizer.clone());
    llm.assign(ModelRole::Chat, chat_id(&chat));
    llm.assign(ModelRole::Classifier, chat_id(&classifier));
    llm.assign(ModelRole::Summarizer, chat_id(&summarizer));

    let resolver = EntityResolver::new(llm.for_role(ModelRole::Classifier), &config.resolver)
        .expect("resolver");
    let summarizer_impl = LlmSummarizer::new(llm.for_role(ModelRole::Summarizer));

    let state = AppState {
        sessions: Arc::new(SessionStore::ephemeral(&config.sessions, &config.archival)),
        config: Arc::new(config),
        llm: Arc::new(llm),
        session_locks: Arc::new(SessionLockMap::new()),
        tools: Arc::new(tool_context()),
        resolver: Arc::new(resolver),
        summarizer: Arc::new(summarizer_impl),
    };

    Harness {
        state,
        chat,
        classifier,
        summarizer,
    }
}

fn chat_id(p: &Arc<ScriptedProvider>) -> String {
    use pr_providers::LlmProvider;
    p.provider_id().to_string()
}
