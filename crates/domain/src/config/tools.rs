use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolLoopConfig {
    /// Maximum model rounds per user message.
    #[serde(default = "d_5")]
    pub max_rounds: usize,
}

impl Default for ToolLoopConfig {
    fn default() -> Self {
        Self { max_rounds: d_5() }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Entity data source
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Snapshot endpoint; the symbol is appended as a path segment.
    /// When unset the tools run against an empty in-memory source.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "d_300")]
    pub cache_ttl_secs: u64,
    #[serde(default = "d_10000")]
    pub timeout_ms: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            cache_ttl_secs: d_300(),
            timeout_ms: d_10000(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Knowledge base
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Directory of `.txt`/`.md` documents searched by the knowledge tool.
    #[serde(default = "d_docs_dir")]
    pub docs_dir: PathBuf,
    #[serde(default = "d_3")]
    pub max_excerpts: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            docs_dir: d_docs_dir(),
            max_excerpts: d_3(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_5() -> usize {
    5
}
fn d_3() -> usize {
    3
}
fn d_300() -> u64 {
    300
}
fn d_10000() -> u64 {
    10_000
}
fn d_docs_dir() -> PathBuf {
    PathBuf::from("./data/docs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_loop_defaults_to_five_rounds() {
        let cfg: ToolLoopConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.max_rounds, 5);
    }

    #[test]
    fn data_config_parses_base_url() {
        let cfg: DataConfig =
            toml::from_str(r#"base_url = "http://localhost:9000/snapshot""#).unwrap();
        assert_eq!(cfg.base_url.as_deref(), Some("http://localhost:9000/snapshot"));
        assert_eq!(cfg.cache_ttl_secs, 300);
    }
}
