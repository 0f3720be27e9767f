pub mod chat;
pub mod health;
pub mod sessions;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the API router. Every route is also served without the `/v1`
/// prefix for frontends that call the bare paths.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Chat
        .route("/v1/chat/stream", post(chat::chat_stream))
        .route("/chat", post(chat::chat_stream))
        // Sessions
        .route(
            "/v1/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route("/v1/sessions/:id", get(sessions::get_session))
        .route("/sessions/:id", get(sessions::get_session))
}
