//! Session persistence for Prysm.
//!
//! An append-only per-session message log with title/preview metadata, and
//! day-bucketed archival that replaces completed UTC days with a compact
//! summary snapshot.

pub mod archive;
pub mod model;
pub mod store;

pub use archive::{ArchiveOutcome, NoSummarizer, Summarizer};
pub use model::{recent_turns, Session, SessionSummary, Snapshot, Turn, TurnRole};
pub use store::SessionStore;
