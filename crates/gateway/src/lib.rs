//! Prysm gateway: entity resolution, the tool-invocation loop, the
//! per-request orchestrator, the HTTP API and the `prysm` CLI.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
