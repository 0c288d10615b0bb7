//! Client configuration.
//!
//! Defaults point at a local backend. Hosts override them either with
//! partial JSON (every field is optional) or from the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header the tunnel in front of the backend needs to skip its browser
/// interstitial.
pub const TUNNEL_BYPASS_HEADER: (&str, &str) = ("ngrok-skip-browser-warning", "true");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Sent on every request after the endpoint's own headers.
    pub extra_headers: Vec<(String, String)>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            extra_headers: vec![(
                TUNNEL_BYPASS_HEADER.0.to_string(),
                TUNNEL_BYPASS_HEADER.1.to_string(),
            )],
        }
    }
}

impl ChatConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    /// Parse a (possibly partial) JSON config. A zero timeout is rejected.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(raw)?;
        if config.timeout_secs == 0 {
            return Err(serde::de::Error::custom("timeout_secs must be greater than zero"));
        }
        Ok(config)
    }

    /// Defaults overridden by `CHAT_BASE_URL`, `CHAT_MODEL`,
    /// `CHAT_TIMEOUT_SECS`, and `CHAT_TUNNEL_BYPASS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup("CHAT_BASE_URL") {
            config.base_url = url;
        }
        if let Some(model) = lookup("CHAT_MODEL") {
            config.model = model;
        }
        if let Some(raw) = lookup("CHAT_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout_secs = secs,
                _ => tracing::warn!(value = %raw, "ignoring invalid CHAT_TIMEOUT_SECS"),
            }
        }
        if let Some(flag) = lookup("CHAT_TUNNEL_BYPASS") {
            if matches!(flag.as_str(), "0" | "false" | "no" | "off") {
                config
                    .extra_headers
                    .retain(|(name, _)| !name.eq_ignore_ascii_case(TUNNEL_BYPASS_HEADER.0));
            }
        }
        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
