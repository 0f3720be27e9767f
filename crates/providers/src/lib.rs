pub mod openai_compat;
pub mod registry;
pub mod scripted;
pub mod session;
pub mod traits;
pub(crate) mod sse;
pub mod util;

// Re-exports for convenience.
pub use registry::{ProviderRegistry, RoleBinding};
pub use session::ChatSession;
pub use traits::{ChatRequest, ChatResponse, LlmProvider};
