use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// `GET /health`: liveness plus what the process is running with.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": state.llm.list_providers(),
        "sessions": state.sessions.len(),
        "durable_store": state.sessions.is_durable(),
    }))
}
