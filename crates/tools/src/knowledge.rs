//! `consult_knowledge_base`: paragraph search over local `.txt`/`.md`
//! documents, ranked by query-term overlap.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pr_domain::config::KnowledgeConfig;
use pr_domain::error::{Error, Result};
use serde::Deserialize;
use serde_json::json;

use crate::result::ToolResult;

/// Terms shorter than this are ignored.
const MIN_TERM_CHARS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeArgs {
    pub query: String,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    docs_dir: PathBuf,
    max_excerpts: usize,
}

impl KnowledgeBase {
    pub fn new(cfg: &KnowledgeConfig) -> Self {
        Self {
            docs_dir: cfg.docs_dir.clone(),
            max_excerpts: cfg.max_excerpts,
        }
    }

    /// Up to `max_excerpts` paragraphs sharing at least one term with the
    /// query, best first. A missing directory yields nothing.
    pub async fn search(&self, query: &str) -> Result<Vec<String>> {
        let dir = self.docs_dir.clone();
        let query = query.to_string();
        let max = self.max_excerpts;
        tokio::task::spawn_blocking(move || search_dir(&dir, &query, max))
            .await
            .map_err(|e| Error::Other(format!("knowledge search task: {e}")))?
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_TERM_CHARS)
        .map(str::to_lowercase)
        .collect()
}

fn search_dir(dir: &Path, query: &str, max: usize) -> Result<Vec<String>> {
    let wanted = terms(query);
    if wanted.is_empty() || max == 0 || !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("txt") || e.eq_ignore_ascii_case("md"))
        })
        .collect();
    files.sort();

    // (score, order, paragraph); order keeps ties in document order.
    let mut scored: Vec<(usize, usize, String)> = Vec::new();
    for path in files {
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping unreadable document");
                continue;
            }
        };
        for paragraph in content.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            let overlap = terms(paragraph).intersection(&wanted).count();
            if overlap > 0 {
                let order = scored.len();
                scored.push((overlap, order, paragraph.to_string()));
            }
        }
    }

    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    Ok(scored.into_iter().take(max).map(|(_, _, p)| p).collect())
}

pub async fn consult(args: &KnowledgeArgs, kb: &KnowledgeBase) -> ToolResult {
    let excerpts = match kb.search(&args.query).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e, "knowledge base search failed");
            Vec::new()
        }
    };
    if excerpts.is_empty() {
        return ToolResult::empty("No relevant info found in uploaded documents.");
    }

    let joined = excerpts
        .iter()
        .map(|e| format!("Excerpt: {e}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    ToolResult::text_only(json!({
        "result": "Found relevant document excerpts.",
        "excerpts": joined,
    }))
}
