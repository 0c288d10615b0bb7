//! Chat client core for the mobile app.
//!
//! # Overview
//! Builds chat completion requests, executes them once with a bounded
//! timeout, and classifies every outcome into a reply or an `ApiError`.
//! Also hosts the local item store the app keeps alongside the chat.
//!
//! # Design
//! - `ChatClient` is immutable; `build_*` produces an `HttpRequest` and
//!   `parse_*` consumes an `HttpResponse`, so hosts may do the I/O
//!   themselves. `send_message` runs a `Transport` in between.
//! - `Endpoint` is a closed enum of remote operations.
//! - `Conversation` layers the loading flag, the last reply/error, and the
//!   one-send-at-a-time rule on top of the client.
//! - Types use owned `String` / `Vec` fields to simplify FFI mapping.

pub mod client;
pub mod config;
pub mod conversation;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod items;
pub mod logging;
pub mod transport;
pub mod types;

pub use client::ChatClient;
pub use config::ChatConfig;
pub use conversation::Conversation;
pub use endpoint::Endpoint;
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use items::{Item, ItemStore, StoreError};
pub use transport::{Transport, UreqTransport};
pub use types::{ChatChoice, ChatData, ChatMessage, ChatRequest, ChatResponse, ChatUsage, ReasoningDetail};
