//! Session store.
//!
//! One JSON document per session under `state_path/<id>.json`, with an
//! in-memory write-through cache so reads never hit disk after startup.
//! Writes go through `spawn_blocking` and a temp-file rename.
//!
//! When the state directory cannot be created or written, the store keeps
//! working from memory only: nothing is durably saved, a `StoreDegraded`
//! trace event is emitted, and requests are not failed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use pr_domain::config::{ArchivalConfig, SessionsConfig};
use pr_domain::error::{Error, Result};
use pr_domain::trace::TraceEvent;

use crate::archive::{apply_archive, plan_archive, ArchiveOutcome, Summarizer};
use crate::model::{Session, SessionSummary, Turn};

const MAX_ID_LEN: usize = 128;

/// Ids become file names, so only a conservative alphabet is accepted.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub struct SessionStore {
    /// `None` when running ephemeral.
    dir: Option<PathBuf>,
    sessions: RwLock<HashMap<String, Session>>,
    durable: AtomicBool,
    config: SessionsConfig,
    archival: ArchivalConfig,
}

impl SessionStore {
    /// Open the store at `config.state_path`, loading every stored document.
    ///
    /// Never fails: an unusable directory yields an ephemeral store.
    pub fn open(config: &SessionsConfig, archival: &ArchivalConfig) -> Self {
        match load_dir(&config.state_path) {
            Ok(sessions) => {
                tracing::info!(
                    sessions = sessions.len(),
                    path = %config.state_path.display(),
                    "session store loaded"
                );
                Self {
                    dir: Some(config.state_path.clone()),
                    sessions: RwLock::new(sessions),
                    durable: AtomicBool::new(true),
                    config: config.clone(),
                    archival: archival.clone(),
                }
            }
            Err(e) => {
                TraceEvent::StoreDegraded {
                    session_id: String::new(),
                    reason: format!("opening {}: {e}", config.state_path.display()),
                }
                .emit();
                tracing::warn!(
                    path = %config.state_path.display(),
                    error = %e,
                    "session store unavailable, running in memory only"
                );
                Self::ephemeral(config, archival)
            }
        }
    }

    /// A store that never touches disk.
    pub fn ephemeral(config: &SessionsConfig, archival: &ArchivalConfig) -> Self {
        Self {
            dir: None,
            sessions: RwLock::new(HashMap::new()),
            durable: AtomicBool::new(false),
            config: config.clone(),
            archival: archival.clone(),
        }
    }

    /// Whether the last write reached disk.
    pub fn is_durable(&self) -> bool {
        self.dir.is_some() && self.durable.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().get(id).cloned()
    }

    /// All sessions, most recently updated first.
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut rows: Vec<SessionSummary> =
            self.sessions.read().values().map(Session::summary).collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        rows
    }

    /// Create an empty session with a fresh id.
    pub async fn create(&self) -> Session {
        let session = Session::new(
            uuid::Uuid::new_v4().to_string(),
            self.config.default_title.clone(),
            Utc::now(),
        );
        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());
        self.persist(&session).await;
        session
    }

    /// Return the session for `id`, creating it on first contact. Missing or
    /// unusable ids get a fresh one. Returns `(session, is_new)`.
    pub async fn load_or_create(&self, id: Option<&str>) -> (Session, bool) {
        let id = match id.map(str::trim) {
            Some(id) if is_valid_session_id(id) => id.to_string(),
            Some(bad) if !bad.is_empty() => {
                tracing::warn!(session_id = %bad, "rejecting malformed session id");
                uuid::Uuid::new_v4().to_string()
            }
            _ => uuid::Uuid::new_v4().to_string(),
        };

        if let Some(existing) = self.get(&id) {
            TraceEvent::SessionResolved {
                session_id: id,
                is_new: false,
            }
            .emit();
            return (existing, false);
        }

        let session = Session::new(id.clone(), self.config.default_title.clone(), Utc::now());
        let session = {
            let mut sessions = self.sessions.write();
            sessions.entry(id.clone()).or_insert(session).clone()
        };
        self.persist(&session).await;

        TraceEvent::SessionResolved {
            session_id: id,
            is_new: true,
        }
        .emit();
        (session, true)
    }

    /// Append turns to the live log.
    pub async fn append_turns(&self, id: &str, turns: Vec<Turn>) -> Result<()> {
        let count = turns.len();
        let snapshot = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .get_mut(id)
                .ok_or_else(|| Error::Other(format!("unknown session {id}")))?;
            session.turns.extend(turns);
            session.updated_at = Utc::now();
            session.clone()
        };
        self.persist(&snapshot).await;

        TraceEvent::TurnsAppended {
            session_id: id.to_owned(),
            turns: count,
        }
        .emit();
        Ok(())
    }

    /// Set title and/or preview.
    pub async fn set_metadata(
        &self,
        id: &str,
        title: Option<String>,
        preview: Option<String>,
    ) -> Result<()> {
        let snapshot = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .get_mut(id)
                .ok_or_else(|| Error::Other(format!("unknown session {id}")))?;
            if let Some(title) = title {
                session.title = title;
            }
            if let Some(preview) = preview {
                session.preview = preview;
            }
            session.clone()
        };
        self.persist(&snapshot).await;
        Ok(())
    }

    /// Move completed UTC days out of the live log into snapshots.
    pub async fn archive_stale_days(
        &self,
        id: &str,
        summarizer: &dyn Summarizer,
        now: DateTime<Utc>,
    ) -> Result<ArchiveOutcome> {
        if !self.archival.enabled {
            return Ok(ArchiveOutcome::default());
        }
        let session = self
            .get(id)
            .ok_or_else(|| Error::Other(format!("unknown session {id}")))?;

        // Summarization awaits the network, so it runs on a copy; the result
        // is applied by day key and so tolerates turns appended meanwhile.
        let outcome = plan_archive(&session, summarizer, &self.archival, now).await;
        if outcome.is_empty() {
            return Ok(outcome);
        }

        let snapshot = {
            let mut sessions = self.sessions.write();
            let Some(session) = sessions.get_mut(id) else {
                return Ok(outcome);
            };
            apply_archive(session, &outcome);
            session.clone()
        };
        self.persist(&snapshot).await;
        Ok(outcome)
    }

    /// Write every session to disk.
    pub async fn flush(&self) -> Result<()> {
        let Some(dir) = self.dir.clone() else {
            return Ok(());
        };
        let all: Vec<Session> = self.sessions.read().values().cloned().collect();
        tokio::task::spawn_blocking(move || {
            for session in &all {
                write_document(&dir, session)?;
            }
            Ok::<(), Error>(())
        })
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
    }

    async fn persist(&self, session: &Session) {
        let Some(dir) = self.dir.clone() else {
            return;
        };
        let doc = session.clone();
        let result = tokio::task::spawn_blocking(move || write_document(&dir, &doc))
            .await
            .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))
            .and_then(|r| r);

        match result {
            Ok(()) => self.durable.store(true, Ordering::Relaxed),
            Err(e) => {
                self.durable.store(false, Ordering::Relaxed);
                tracing::warn!(session_id = %session.id, error = %e, "session write failed");
                TraceEvent::StoreDegraded {
                    session_id: session.id.clone(),
                    reason: e.to_string(),
                }
                .emit();
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Disk layout
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn unavailable(path: &Path, e: std::io::Error) -> Error {
    Error::StoreUnavailable(format!("{}: {e}", path.display()))
}

fn load_dir(dir: &Path) -> Result<HashMap<String, Session>> {
    std::fs::create_dir_all(dir).map_err(|e| unavailable(dir, e))?;
    let mut sessions = HashMap::new();

    for entry in std::fs::read_dir(dir).map_err(|e| unavailable(dir, e))? {
        let path = entry.map_err(|e| unavailable(dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable session");
                continue;
            }
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                sessions.insert(session.id.clone(), session);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping corrupt session");
            }
        }
    }

    Ok(sessions)
}

fn write_document(dir: &Path, session: &Session) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| unavailable(dir, e))?;
    let json = serde_json::to_string_pretty(session)?;
    let path = dir.join(format!("{}.json", session.id));
    let tmp = dir.join(format!(".{}.json.tmp", session.id));
    std::fs::write(&tmp, json).map_err(|e| unavailable(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| unavailable(&path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::NoSummarizer;

    fn config(dir: &Path) -> SessionsConfig {
        SessionsConfig {
            state_path: dir.to_path_buf(),
            ..SessionsConfig::default()
        }
    }

    #[test]
    fn session_id_validation() {
        assert!(is_valid_session_id("a1b2-c3_d4"));
        assert!(!is_valid_session_id("../etc/passwd"));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id(&"x".repeat(MAX_ID_LEN + 1)));
    }

    #[tokio::test]
    async fn sessions_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let store = SessionStore::open(&cfg, &ArchivalConfig::default());
        assert!(store.is_durable());

        let (session, is_new) = store.load_or_create(Some("chat-1")).await;
        assert!(is_new);
        assert_eq!(session.title, "New Chat");
        store
            .append_turns("chat-1", vec![Turn::user("hello", Utc::now())])
            .await
            .unwrap();

        let reopened = SessionStore::open(&cfg, &ArchivalConfig::default());
        let loaded = reopened.get("chat-1").unwrap();
        assert_eq!(loaded.turns.len(), 1);
        assert_eq!(loaded.turns[0].text(), "hello");
    }

    #[tokio::test]
    async fn malformed_id_gets_fresh_session() {
        let store = SessionStore::ephemeral(&SessionsConfig::default(), &ArchivalConfig::default());
        let (session, is_new) = store.load_or_create(Some("../../oops")).await;
        assert!(is_new);
        assert_ne!(session.id, "../../oops");
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = SessionStore::ephemeral(&SessionsConfig::default(), &ArchivalConfig::default());
        let a = store.create().await;
        let b = store.create().await;
        store
            .append_turns(&a.id, vec![Turn::user("bump", Utc::now())])
            .await
            .unwrap();
        let ids: Vec<String> = store.list().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn unwritable_dir_degrades_to_memory() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();
        let store = SessionStore::open(&config(&file), &ArchivalConfig::default());
        assert!(!store.is_durable());

        let (session, _) = store.load_or_create(None).await;
        store
            .append_turns(&session.id, vec![Turn::user("still works", Utc::now())])
            .await
            .unwrap();
        assert_eq!(store.get(&session.id).unwrap().turns.len(), 1);
    }

    #[test]
    fn disk_failures_surface_as_store_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        assert!(matches!(load_dir(&file), Err(Error::StoreUnavailable(_))));
        let session = Session::new("s1", "t", Utc::now());
        assert!(matches!(
            write_document(&file, &session),
            Err(Error::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn archival_disabled_is_noop() {
        let archival = ArchivalConfig {
            enabled: false,
            ..ArchivalConfig::default()
        };
        let store = SessionStore::ephemeral(&SessionsConfig::default(), &archival);
        let (s, _) = store.load_or_create(None).await;
        let old = Utc::now() - chrono::Duration::days(3);
        store
            .append_turns(&s.id, vec![Turn::user("old", old)])
            .await
            .unwrap();
        let outcome = store
            .archive_stale_days(&s.id, &NoSummarizer, Utc::now())
            .await
            .unwrap();
        assert!(outcome.is_empty());
        assert_eq!(store.get(&s.id).unwrap().turns.len(), 1);
    }
}
