//! The send/clear state machine behind a chat surface.
//!
//! # Design
//! A `Conversation` owns the last reply, the last error message, and a
//! loading flag. At most one send is outstanding at a time: a second
//! `send` while the first is running is rejected with `SendInProgress`
//! and leaves the stored state alone. Every other outcome produces exactly
//! one of {reply, error message}.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::client::ChatClient;
use crate::error::ApiError;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct State {
    reply: Option<String>,
    error: Option<String>,
}

#[derive(Debug)]
pub struct Conversation {
    client: ChatClient,
    state: Mutex<State>,
    loading: AtomicBool,
}

/// Clears the loading flag when the send finishes, however it finishes.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Conversation {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            state: Mutex::new(State::default()),
            loading: AtomicBool::new(false),
        }
    }

    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    /// Send `text` and return the reply, or the message to show instead.
    pub fn send(&self, text: &str) -> Result<String, String> {
        self.try_send(text).map_err(|e| e.user_message())
    }

    /// Like `send`, but keeps the classified error.
    pub fn try_send(&self, text: &str) -> Result<String, ApiError> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("rejected send while another is outstanding");
            return Err(ApiError::SendInProgress);
        }
        let _guard = LoadingGuard(&self.loading);

        self.update(|state| *state = State::default());

        let result = self.client.send_message(text);
        match &result {
            Ok(reply) => self.update(|state| state.reply = Some(reply.clone())),
            Err(e) => {
                tracing::warn!(error = %e, "send failed");
                let message = e.user_message();
                self.update(|state| state.error = Some(message));
            }
        }
        result
    }

    /// Forget the stored reply and error. No network effect.
    pub fn clear(&self) {
        self.update(|state| *state = State::default());
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn last_reply(&self) -> Option<String> {
        self.read(|state| state.reply.clone())
    }

    pub fn last_error(&self) -> Option<String> {
        self.read(|state| state.error.clone())
    }

    fn update(&self, f: impl FnOnce(&mut State)) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state);
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        let state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChatConfig;
    use crate::error::TransportError;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::transport::Transport;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::sync::Arc;

    const REPLY: &str = r#"{"success":true,"data":{"id":"gen-1","provider":"Google","model":"m","object":"chat.completion","created":1,"choices":[{"finish_reason":"stop","native_finish_reason":"STOP","index":0,"message":{"role":"assistant","content":"Hi there!"}}],"usage":{"prompt_tokens":1,"completion_tokens":1,"total_tokens":2}}}"#;

    /// Answers requests with scripted statuses and bodies, in order.
    struct Scripted {
        responses: Mutex<VecDeque<(u16, &'static str)>>,
        calls: AtomicUsize,
    }

    impl Transport for Scripted {
        fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (status, body) = self.responses.lock().unwrap().pop_front().unwrap();
            Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            })
        }
    }

    /// Blocks inside `execute` until the test releases it.
    struct Gate {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl Transport for Gate {
        fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: REPLY.to_string(),
            })
        }
    }

    fn conversation(responses: &[(u16, &'static str)]) -> (Conversation, Arc<Scripted>) {
        let transport = Arc::new(Scripted {
            responses: Mutex::new(responses.iter().copied().collect()),
            calls: AtomicUsize::new(0),
        });
        let client = ChatClient::with_transport(ChatConfig::default(), transport.clone());
        (Conversation::new(client), transport)
    }

    #[test]
    fn successful_send_stores_reply() {
        let (conv, _) = conversation(&[(200, REPLY)]);
        assert_eq!(conv.send("Hello"), Ok("Hi there!".to_string()));
        assert_eq!(conv.last_reply().as_deref(), Some("Hi there!"));
        assert!(conv.last_error().is_none());
        assert!(!conv.is_loading());
    }

    #[test]
    fn blank_send_reports_empty_message_without_io() {
        let (conv, transport) = conversation(&[(200, REPLY)]);
        assert_eq!(conv.send(" \n"), Err("Please enter a message.".to_string()));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(conv.last_error().as_deref(), Some("Please enter a message."));
    }

    #[test]
    fn failure_clears_previous_reply() {
        let (conv, _) = conversation(&[(200, REPLY), (502, "bad gateway")]);
        conv.send("Hello").unwrap();
        assert_eq!(conv.send("Again"), Err("Server returned status 502.".to_string()));
        assert!(conv.last_reply().is_none());
        assert_eq!(conv.last_error().as_deref(), Some("Server returned status 502."));
    }

    #[test]
    fn success_clears_previous_error() {
        let (conv, _) = conversation(&[(500, ""), (200, REPLY)]);
        assert!(conv.send("Hello").is_err());
        assert_eq!(conv.send("Hello").unwrap(), "Hi there!");
        assert!(conv.last_error().is_none());
    }

    #[test]
    fn clear_resets_state() {
        let (conv, _) = conversation(&[(500, "")]);
        assert!(conv.send("Hello").is_err());
        assert!(conv.last_error().is_some());
        conv.clear();
        assert!(conv.last_error().is_none());
        assert!(conv.last_reply().is_none());
    }

    #[test]
    fn second_send_is_rejected_while_first_is_outstanding() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let gate = Arc::new(Gate {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        let client = ChatClient::with_transport(ChatConfig::default(), gate);
        let conv = Arc::new(Conversation::new(client));

        let first = {
            let conv = Arc::clone(&conv);
            std::thread::spawn(move || conv.try_send("first"))
        };
        entered_rx.recv().unwrap();
        assert!(conv.is_loading());

        let err = conv.try_send("second").unwrap_err();
        assert!(matches!(err, ApiError::SendInProgress));
        assert!(conv.last_error().is_none());

        release_tx.send(()).unwrap();
        assert_eq!(first.join().unwrap().unwrap(), "Hi there!");
        assert!(!conv.is_loading());
        assert_eq!(conv.last_reply().as_deref(), Some("Hi there!"));
    }
}
