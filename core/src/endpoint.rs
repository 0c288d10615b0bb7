//! Remote operations the client knows how to call.
//!
//! The set of operations is closed, so each one is an enum variant carrying
//! its fixed path, method, and headers.

use url::Url;

use crate::error::ApiError;
use crate::http::HttpMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /api/ai/chat`
    ChatCompletion,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::ChatCompletion => "/api/ai/chat",
        }
    }

    pub fn method(self) -> HttpMethod {
        match self {
            Endpoint::ChatCompletion => HttpMethod::Post,
        }
    }

    pub fn headers(self) -> Vec<(String, String)> {
        match self {
            Endpoint::ChatCompletion => {
                vec![("content-type".to_string(), "application/json".to_string())]
            }
        }
    }

    /// Join `base_url` and this endpoint's path into an absolute URL.
    ///
    /// `base_url` is expected without a trailing slash.
    pub fn resolve(self, base_url: &str) -> Result<Url, ApiError> {
        let target = format!("{base_url}{}", self.path());
        let url = Url::parse(&target).map_err(|e| {
            tracing::warn!(%target, error = %e, "endpoint did not resolve");
            ApiError::InvalidTarget(format!("{target}: {e}"))
        })?;
        if url.cannot_be_a_base() || !url.has_host() {
            tracing::warn!(%target, "endpoint resolved without a host");
            return Err(ApiError::InvalidTarget(format!("{target}: missing host")));
        }
        tracing::trace!(endpoint = ?self, %url, "resolved endpoint");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_completion_descriptor() {
        let ep = Endpoint::ChatCompletion;
        assert_eq!(ep.path(), "/api/ai/chat");
        assert_eq!(ep.method(), HttpMethod::Post);
        assert_eq!(
            ep.headers(),
            vec![("content-type".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn resolves_against_base() {
        let url = Endpoint::ChatCompletion.resolve("https://abc.ngrok-free.app").unwrap();
        assert_eq!(url.as_str(), "https://abc.ngrok-free.app/api/ai/chat");
    }

    #[test]
    fn resolves_against_base_with_path_prefix() {
        let url = Endpoint::ChatCompletion.resolve("http://localhost:3000/v2").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/v2/api/ai/chat");
    }

    #[test]
    fn rejects_relative_base() {
        let err = Endpoint::ChatCompletion.resolve("not a url").unwrap_err();
        assert!(matches!(err, ApiError::InvalidTarget(_)));
    }

    #[test]
    fn rejects_empty_base() {
        let err = Endpoint::ChatCompletion.resolve("").unwrap_err();
        assert!(matches!(err, ApiError::InvalidTarget(_)));
    }

    #[test]
    fn rejects_hostless_base() {
        let err = Endpoint::ChatCompletion.resolve("mailto:someone").unwrap_err();
        assert!(matches!(err, ApiError::InvalidTarget(_)));
    }
}
