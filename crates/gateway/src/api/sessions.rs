//! Session read/create endpoints.
//!
//! - `GET  /v1/sessions`     summaries, newest first
//! - `POST /v1/sessions`     create an empty session
//! - `GET  /v1/sessions/:id`  full stored document

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sessions.list())
}

pub async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": session.id,
            "title": session.title,
        })),
    )
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.sessions.get(&id) {
        Some(session) => Json(serde_json::to_value(session).unwrap_or_default()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "session not found" })),
        )
            .into_response(),
    }
}
