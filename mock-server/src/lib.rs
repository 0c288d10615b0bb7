use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const CHAT_PATH: &str = "/api/ai/chat";
pub const BYPASS_HEADER: &str = "ngrok-skip-browser-warning";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// How the mock answers `POST /api/ai/chat`.
#[derive(Clone, Debug)]
pub enum Behavior {
    /// Reply with `"Echo: <last user message>"`.
    Echo,
    /// Reply with fixed content.
    Reply(String),
    /// Answer with this status and raw body.
    Status(u16, String),
    /// Status 200 with this raw body.
    Raw(String),
    /// A well-formed envelope with `success: false`.
    Unsuccessful,
    /// A well-formed envelope with no choices.
    NoChoices,
    /// Sleep, then echo.
    Delay(Duration),
}

#[derive(Clone)]
pub struct MockState {
    behavior: Arc<Behavior>,
    hits: Arc<AtomicUsize>,
}

impl MockState {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior: Arc::new(behavior),
            hits: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of chat requests that reached the handler.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub fn app() -> Router {
    app_with(MockState::new(Behavior::Echo))
}

pub fn app_with(state: MockState) -> Router {
    Router::new().route(CHAT_PATH, post(chat)).with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockState::new(Behavior::Echo)).await
}

pub async fn run_with(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

/// Builds a success envelope around `content`.
pub fn envelope(model: &str, content: &str, success: bool, with_choice: bool) -> Value {
    let choices = if with_choice {
        json!([{
            "logprobs": null,
            "finish_reason": "stop",
            "native_finish_reason": "STOP",
            "index": 0,
            "message": {
                "role": "assistant",
                "content": content,
                "refusal": null,
                "reasoning": null
            }
        }])
    } else {
        json!([])
    };
    let completion_tokens = content.split_whitespace().count();
    json!({
        "success": success,
        "data": {
            "id": format!("gen-{}", Uuid::new_v4()),
            "provider": "Mock",
            "model": model,
            "object": "chat.completion",
            "created": 1_735_689_600,
            "choices": choices,
            "usage": {
                "prompt_tokens": 1,
                "completion_tokens": completion_tokens,
                "total_tokens": 1 + completion_tokens
            }
        }
    })
}

async fn chat(State(state): State<MockState>, headers: HeaderMap, body: String) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    // The tunnel serves a browser warning page to clients without the header.
    if !headers.contains_key(BYPASS_HEADER) {
        return Html("<!DOCTYPE html><html><body>You are about to visit this site</body></html>")
            .into_response();
    }

    let request: ChatRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting malformed chat request");
            return (StatusCode::BAD_REQUEST, Json(json!({"success": false, "error": e.to_string()})))
                .into_response();
        }
    };
    let last = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .unwrap_or_default();

    match state.behavior.as_ref() {
        Behavior::Echo => Json(envelope(&request.model, &format!("Echo: {last}"), true, true)).into_response(),
        Behavior::Reply(content) => Json(envelope(&request.model, content, true, true)).into_response(),
        Behavior::Status(code, raw) => {
            let status = StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, raw.clone()).into_response()
        }
        Behavior::Raw(raw) => (StatusCode::OK, raw.clone()).into_response(),
        Behavior::Unsuccessful => Json(envelope(&request.model, "", false, true)).into_response(),
        Behavior::NoChoices => Json(envelope(&request.model, "", true, false)).into_response(),
        Behavior::Delay(duration) => {
            tokio::time::sleep(*duration).await;
            Json(envelope(&request.model, &format!("Echo: {last}"), true, true)).into_response()
        }
    }
}
