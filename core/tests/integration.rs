//! End-to-end sends against the live mock backend.
//!
//! # Design
//! Starts the mock server on a random port with a scripted behavior, then
//! drives `ChatClient` / `Conversation` through the real `ureq` transport.
//! Validates request building, status handling, decoding, and the business
//! check over actual HTTP.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chat_core::{ApiError, ChatClient, ChatConfig, Conversation, HttpResponse, TransportError};
use mock_server::{Behavior, MockState};

/// Serve `state` on a random local port from a background runtime.
fn start(state: MockState) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, state).await
        })
        .unwrap();
    });

    addr
}

fn client(addr: SocketAddr) -> ChatClient {
    ChatClient::new(ChatConfig::with_base_url(&format!("http://{addr}")))
}

#[test]
fn hello_round_trip() {
    let state = MockState::new(Behavior::Reply("Hi there!".to_string()));
    let addr = start(state.clone());

    let reply = client(addr).send_message("Hello").unwrap();
    assert_eq!(reply, "Hi there!");
    assert_eq!(state.hits(), 1);
}

#[test]
fn echo_preserves_content() {
    let addr = start(MockState::new(Behavior::Echo));
    let reply = client(addr).send_message("  spaced out  ").unwrap();
    assert_eq!(reply, "Echo:   spaced out  ");
}

#[test]
fn blank_message_never_reaches_server() {
    let state = MockState::new(Behavior::Echo);
    let addr = start(state.clone());
    let client = client(addr);

    for input in ["", "   ", "\n"] {
        let err = client.send_message(input).unwrap_err();
        assert!(matches!(err, ApiError::EmptyMessage));
    }
    assert_eq!(state.hits(), 0);
}

#[test]
fn non_success_status_is_reported_literally() {
    for status in [400u16, 404, 429, 500, 503] {
        let addr = start(MockState::new(Behavior::Status(
            status,
            r#"{"success":true,"data":{}}"#.to_string(),
        )));
        let err = client(addr).send_message("Hello").unwrap_err();
        assert!(
            matches!(err, ApiError::BadStatus { status: s, .. } if s == status),
            "{status}: {err}"
        );
    }
}

#[test]
fn empty_body_is_empty_payload() {
    let addr = start(MockState::new(Behavior::Raw(String::new())));
    let err = client(addr).send_message("Hello").unwrap_err();
    assert!(matches!(err, ApiError::EmptyPayload));
}

#[test]
fn garbage_body_is_decoding_failure() {
    let addr = start(MockState::new(Behavior::Raw(r#"{"success":true}"#.to_string())));
    let err = client(addr).send_message("Hello").unwrap_err();
    assert!(matches!(err, ApiError::DecodingFailed(_)));
    assert!(err.to_string().contains("data"));
}

#[test]
fn unsuccessful_or_empty_envelope_is_invalid_shape() {
    for behavior in [Behavior::Unsuccessful, Behavior::NoChoices] {
        let addr = start(MockState::new(behavior));
        let err = client(addr).send_message("Hello").unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponseShape(_)));
    }
}

#[test]
fn missing_bypass_header_hits_tunnel_page() {
    let addr = start(MockState::new(Behavior::Echo));
    let config = ChatConfig {
        base_url: format!("http://{addr}"),
        extra_headers: Vec::new(),
        ..Default::default()
    };
    let err = ChatClient::new(config).send_message("Hello").unwrap_err();
    assert!(matches!(err, ApiError::DecodingFailed(_)));
}

/// Answer one request with a fixed status line and body, bypassing axum.
fn serve_raw_once(status_line: &'static str, body: Vec<u8>) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        // The chat body is a single JSON object ending in `}]}`.
        while !request.ends_with(b"}]}") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let head = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&body);
    });

    addr
}

#[test]
fn oversized_error_body_keeps_status() {
    let addr = serve_raw_once("500 Internal Server Error", vec![b'x'; 11 * 1024 * 1024]);
    let err = client(addr).send_message("Hello").unwrap_err();
    assert!(matches!(err, ApiError::BadStatus { status: 500, .. }), "{err}");
    assert_eq!(err.user_message(), "Server returned status 500.");
}

#[test]
fn non_utf8_error_body_keeps_status() {
    let addr = serve_raw_once("502 Bad Gateway", vec![0xff, 0xfe, b'o', b'o', b'p', b's']);
    let err = client(addr).send_message("Hello").unwrap_err();
    assert!(matches!(err, ApiError::BadStatus { status: 502, .. }), "{err}");
}

#[test]
fn slow_server_times_out() {
    let addr = start(MockState::new(Behavior::Delay(Duration::from_secs(5))));
    let config = ChatConfig {
        base_url: format!("http://{addr}"),
        timeout_secs: 1,
        ..Default::default()
    };

    let started = Instant::now();
    let err = ChatClient::new(config).send_message("Hello").unwrap_err();
    assert!(matches!(err, ApiError::TransportFailed(TransportError::Timeout(_))), "{err}");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn unreachable_server_is_transport_failure() {
    // Bind then drop to get a port nobody listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let err = client(addr).send_message("Hello").unwrap_err();
    assert!(matches!(err, ApiError::TransportFailed(_)));
    assert_eq!(
        err.user_message(),
        "Network error. Please check your connection and try again."
    );
}

#[test]
fn host_driven_build_and_parse() {
    let addr = start(MockState::new(Behavior::Reply("Hi there!".to_string())));
    let client = client(addr);

    let request = client.build_chat("Hello").unwrap();
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();
    let mut response = agent
        .post(&request.url)
        .header("ngrok-skip-browser-warning", "true")
        .content_type("application/json")
        .send(request.body.unwrap().as_bytes())
        .unwrap();
    let response = HttpResponse {
        status: response.status().as_u16(),
        headers: Vec::new(),
        body: response.body_mut().read_to_string().unwrap(),
    };

    assert_eq!(client.parse_reply(response).unwrap(), "Hi there!");
}

#[test]
fn conversation_over_http() {
    let addr = start(MockState::new(Behavior::Echo));
    let conversation = Arc::new(Conversation::new(client(addr)));

    assert_eq!(conversation.send("Hello"), Ok("Echo: Hello".to_string()));
    assert_eq!(conversation.last_reply().as_deref(), Some("Echo: Hello"));
    assert!(!conversation.is_loading());

    assert_eq!(conversation.send(""), Err("Please enter a message.".to_string()));
    assert!(conversation.last_reply().is_none());

    conversation.clear();
    assert!(conversation.last_error().is_none());
}
