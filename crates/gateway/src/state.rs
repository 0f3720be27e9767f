use std::sync::Arc;

use pr_domain::config::Config;
use pr_providers::ProviderRegistry;
use pr_sessions::SessionStore;
use pr_tools::ToolContext;

use crate::runtime::session_lock::SessionLockMap;
use crate::runtime::{EntityResolver, LlmSummarizer};

/// Shared application state passed to all API handlers.
///
/// Every collaborator is built once per process in
/// [`crate::bootstrap::build_app_state`]; tests build their own with fakes.
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub llm: Arc<ProviderRegistry>,

    // ── Sessions ──────────────────────────────────────────────────────
    pub sessions: Arc<SessionStore>,
    pub session_locks: Arc<SessionLockMap>,

    // ── Analysis ──────────────────────────────────────────────────────
    pub tools: Arc<ToolContext>,
    pub resolver: Arc<EntityResolver>,
    /// Day summaries and session titles.
    pub summarizer: Arc<LlmSummarizer>,
}
