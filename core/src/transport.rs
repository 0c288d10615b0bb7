//! Executing `HttpRequest` values on the network.
//!
//! # Design
//! `Transport` is the single I/O seam of the crate. `ChatClient` hands it a
//! fully built request and gets back plain response data; non-2xx statuses
//! are data, not errors, so status interpretation stays in the client. The
//! body of a non-2xx response is read best-effort.
//! `UreqTransport` owns one `ureq::Agent` (and its connection pool) for its
//! whole lifetime.

use std::time::Duration;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Largest non-2xx body kept for diagnostics.
const ERROR_BODY_LIMIT: u64 = 64 * 1024;

/// Executes one request, exactly once.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    timeout: Duration,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent, timeout }
    }

    fn map_error(&self, err: ureq::Error) -> TransportError {
        match err {
            ureq::Error::Timeout(_) => TransportError::Timeout(self.timeout),
            ureq::Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                TransportError::Timeout(self.timeout)
            }
            other => TransportError::Network(Box::new(other)),
        }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let result = match &request.body {
            Some(body) => builder
                .body(body.clone())
                .map(|req| self.agent.run(req)),
            None => builder.body(()).map(|req| self.agent.run(req)),
        }
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let mut response = result.map_err(|e| self.map_error(e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = if (200..=299).contains(&status) {
            response
                .body_mut()
                .read_to_string()
                .map_err(|e| self.map_error(e))?
        } else {
            // Diagnostic only: an unreadable error body must not hide the status.
            response
                .body_mut()
                .with_config()
                .limit(ERROR_BODY_LIMIT)
                .read_to_string()
                .unwrap_or_else(|e| {
                    tracing::debug!(status, error = %e, "discarding unreadable error body");
                    String::new()
                })
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
