//! Request builder, executor, and response parser for the chat API.
//!
//! # Design
//! `ChatClient` holds its config and a `Transport` and carries no mutable
//! state between calls. Each call is split into a `build_*` step that
//! produces an `HttpRequest` and a `parse_*` step that consumes an
//! `HttpResponse`. Hosts that do their own networking call the two halves
//! directly; everyone else uses `send_message`, which runs the transport in
//! between.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ChatConfig;
use crate::endpoint::Endpoint;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{ChatRequest, ChatResponse};

static GLOBAL: OnceLock<ChatClient> = OnceLock::new();

/// Immutable client for the chat backend. Cheap to clone.
#[derive(Clone)]
pub struct ChatClient {
    base_url: String,
    config: ChatConfig,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    /// Client executing requests through a `ureq` agent with the configured
    /// timeout.
    pub fn new(config: ChatConfig) -> Self {
        let transport = Arc::new(UreqTransport::new(config.timeout()));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: ChatConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config,
            transport,
        }
    }

    /// Process-wide client, configured from the environment on first use.
    pub fn global() -> &'static ChatClient {
        GLOBAL.get_or_init(|| {
            let config = ChatConfig::from_env();
            tracing::info!(base_url = %config.base_url, model = %config.model, "initialized shared chat client");
            ChatClient::new(config)
        })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Resolve `endpoint`, serialize `body`, and assemble the request.
    pub fn build_request<B: Serialize>(
        &self,
        endpoint: Endpoint,
        body: Option<&B>,
    ) -> Result<HttpRequest, ApiError> {
        let url = endpoint.resolve(&self.base_url)?;
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(ApiError::EncodingFailed)?;

        let mut headers = endpoint.headers();
        headers.extend(self.config.extra_headers.iter().cloned());

        Ok(HttpRequest {
            method: endpoint.method(),
            url: url.into(),
            headers,
            body,
        })
    }

    /// Build the chat completion request for `message`.
    ///
    /// Blank input is rejected; otherwise `message` is sent verbatim.
    pub fn build_chat(&self, message: &str) -> Result<HttpRequest, ApiError> {
        if message.trim().is_empty() {
            return Err(ApiError::EmptyMessage);
        }
        let payload = ChatRequest::user(self.config.model.as_str(), message);
        self.build_request(Endpoint::ChatCompletion, Some(&payload))
    }

    /// Validate the status and decode the body into `T`.
    pub fn parse_response<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Err(ApiError::EmptyPayload);
        }
        serde_json::from_str(&response.body).map_err(ApiError::DecodingFailed)
    }

    pub fn parse_chat(&self, response: HttpResponse) -> Result<ChatResponse, ApiError> {
        self.parse_response(response)
    }

    /// Decode a chat response and extract the reply text.
    pub fn parse_reply(&self, response: HttpResponse) -> Result<String, ApiError> {
        let chat = self.parse_chat(response)?;
        extract_reply(chat)
    }

    /// Build, execute once, and decode a call to `endpoint`.
    pub fn execute<T, B>(&self, endpoint: Endpoint, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let request = self.build_request(endpoint, body)?;
        let response = self.run(&request)?;
        self.parse_response(response)
    }

    /// Send `message` to the chat endpoint and return the reply text.
    pub fn send_message(&self, message: &str) -> Result<String, ApiError> {
        let request = self.build_chat(message)?;
        let response = self.run(&request)?;
        self.parse_reply(response).inspect_err(|e| {
            tracing::warn!(error = %e, "chat response rejected");
        })
    }

    fn run(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            body_len = request.body.as_ref().map_or(0, String::len),
            "sending request"
        );
        let response = self.transport.execute(request).map_err(|e| {
            tracing::warn!(url = %request.url, error = %e, "transport failed");
            ApiError::TransportFailed(e)
        })?;
        tracing::debug!(
            status = response.status,
            body_len = response.body.len(),
            "received response"
        );
        Ok(response)
    }
}

/// Map statuses outside 200..=299 (including a missing status) to
/// `BadStatus`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    tracing::warn!(status = response.status, "unexpected HTTP status");
    Err(ApiError::BadStatus {
        status: response.status,
        body: response.body.clone(),
    })
}

fn extract_reply(chat: ChatResponse) -> Result<String, ApiError> {
    if !chat.success {
        return Err(ApiError::InvalidResponseShape("success flag is false".to_string()));
    }
    chat.reply()
        .map(|message| message.content.clone())
        .ok_or_else(|| ApiError::InvalidResponseShape("no choices in response".to_string()))
}
