//! Wire DTOs for the chat completion endpoint.
//!
//! # Design
//! Field names match the snake_case wire names one-to-one, so serde needs
//! no renames except for `ReasoningDetail::kind` (`type` on the wire).
//! Optional message fields are skipped when absent so requests never carry
//! them, and default to `None` when a response leaves them out. Every other
//! field is required: a missing or mistyped field fails the whole decode.

use serde::{Deserialize, Serialize};

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// Outbound payload for `POST /api/ai/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// A single-turn request carrying `content` verbatim as the user message.
    pub fn user(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(content)],
        }
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_details: Option<Vec<ReasoningDetail>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ROLE_USER.to_string(),
            content: content.into(),
            refusal: None,
            reasoning: None,
            reasoning_details: None,
        }
    }
}

/// A structured reasoning fragment attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub format: String,
    pub index: i64,
}

/// Top-level success envelope returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    pub data: ChatData,
}

impl ChatResponse {
    /// The canonical reply, or `None` when the envelope reports failure or
    /// carries no choices.
    pub fn reply(&self) -> Option<&ChatMessage> {
        if !self.success {
            return None;
        }
        self.data.choices.first().map(|choice| &choice.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatData {
    pub id: String,
    pub provider: String,
    pub model: String,
    pub object: String,
    pub created: i64,
    pub choices: Vec<ChatChoice>,
    pub usage: ChatUsage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub logprobs: Option<String>,
    pub finish_reason: String,
    pub native_finish_reason: String,
    pub index: i64,
    pub message: ChatMessage,
}

/// Token accounting. Reported only, never validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}
