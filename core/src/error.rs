//! Error types for the chat client.
//!
//! # Design
//! `ApiError` is the full failure taxonomy of one send: every step of the
//! pipeline (resolve, encode, execute, validate, decode, business check)
//! owns exactly one variant. `Display` carries the technical detail for
//! logs; `user_message` is the short text a chat surface shows.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by `ChatClient` build, parse, and send methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Base address and endpoint path do not form an absolute URL.
    #[error("invalid request target: {0}")]
    InvalidTarget(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    EncodingFailed(#[source] serde_json::Error),

    /// DNS, TLS, connection, or timeout failure.
    #[error("transport failed: {0}")]
    TransportFailed(#[from] TransportError),

    /// The server answered outside 200..=299. `status` is 0 when no status
    /// line could be read.
    #[error("HTTP {status}: {body}")]
    BadStatus { status: u16, body: String },

    /// Success status with nothing in the body.
    #[error("empty response payload")]
    EmptyPayload,

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DecodingFailed(#[source] serde_json::Error),

    /// The user submitted a blank message.
    #[error("message is empty")]
    EmptyMessage,

    /// The payload decoded but carried no usable reply.
    #[error("invalid response shape: {0}")]
    InvalidResponseShape(String),

    /// Another send is still outstanding on the same conversation.
    #[error("a send is already in progress")]
    SendInProgress,
}

impl ApiError {
    /// Text suitable for display in the chat surface.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::InvalidTarget(_) => "Invalid server address.".to_string(),
            ApiError::EncodingFailed(_) => "Could not prepare the message.".to_string(),
            ApiError::TransportFailed(TransportError::Timeout(_)) => {
                "The server took too long to respond. Please try again.".to_string()
            }
            ApiError::TransportFailed(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            ApiError::BadStatus { status, .. } => format!("Server returned status {status}."),
            ApiError::EmptyPayload => "The server sent an empty response.".to_string(),
            ApiError::DecodingFailed(e) => format!("Could not read the server response: {e}"),
            ApiError::EmptyMessage => "Please enter a message.".to_string(),
            ApiError::InvalidResponseShape(_) => {
                "The server response did not contain a reply.".to_string()
            }
            ApiError::SendInProgress => "A message is already being sent.".to_string(),
        }
    }

    /// The HTTP status carried by `BadStatus`, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures raised while executing a request on the network.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be handed to the HTTP stack (bad header, etc).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_status_message_carries_code() {
        let err = ApiError::BadStatus {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.user_message(), "Server returned status 503.");
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "HTTP 503: unavailable");
    }

    #[test]
    fn timeout_gets_its_own_message() {
        let err = ApiError::from(TransportError::Timeout(Duration::from_secs(30)));
        assert!(err.user_message().contains("too long"));
        assert!(err.status().is_none());
    }

    #[test]
    fn decoding_message_includes_cause() {
        let cause = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ApiError::DecodingFailed(cause);
        assert!(err.user_message().starts_with("Could not read the server response: "));
        assert!(std::error::Error::source(&err).is_some());
    }
}
