//! Chat endpoint: one user message in, a stream of `{"content": ..}` frames
//! out.
//!
//! - `POST /v1/chat/stream` (alias `POST /chat`)

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use futures_util::stream::Stream;

use crate::runtime::{run_chat, ChatInput, LoopEvent};
use crate::state::AppState;

pub const SESSION_HEADER: &str = "x-session-id";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/chat/stream (SSE)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat_stream(State(state): State<AppState>, Json(body): Json<ChatInput>) -> Response {
    if body.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "message is required" })),
        )
            .into_response();
    }

    let turn = run_chat(state, body).await;
    let session_id = turn.session_id.clone();

    let mut resp = Sse::new(make_sse_stream(turn.events))
        .keep_alive(KeepAlive::default())
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&session_id) {
        resp.headers_mut().insert(SESSION_HEADER, value);
    }
    resp
}

fn make_sse_stream(
    mut rx: tokio::sync::mpsc::Receiver<LoopEvent>,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let data = serde_json::json!({ "content": event.into_content() }).to_string();
            yield Ok(Event::default().data(data));
        }
        yield Ok(Event::default().data("[DONE]"));
    }
}
