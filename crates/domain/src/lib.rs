//! Shared domain types for the Prysm workspace: errors, streaming events,
//! provider-agnostic messages, the intent model, configuration, and
//! structured trace events.

pub mod capability;
pub mod config;
pub mod error;
pub mod intent;
pub mod payload;
pub mod stream;
pub mod text;
pub mod tool;
pub mod trace;
