//! Request runtime: entity resolution, the bounded tool loop and the
//! orchestrator that sequences them around the session store.
//!
//! Entry point: [`run_chat`] takes a [`ChatInput`] and returns a
//! [`ChatTurn`] whose receiver yields [`LoopEvent`]s as they happen, for
//! SSE streaming or for draining into one string.

pub mod orchestrator;
pub mod prompt;
pub mod resolver;
pub mod session_lock;
pub mod summarize;
pub mod tool_loop;

pub use orchestrator::{collect, run_chat, ChatInput, ChatTurn};
pub use resolver::EntityResolver;
pub use summarize::LlmSummarizer;
pub use tool_loop::{LoopEvent, LoopOutcome, ToolLoop};
