//! Client configuration.

use std::time::Duration;

use parley_app::ChatConfig;

/// Connection and timing settings for a [`crate::Runtime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// REST API base URL.
    pub api_url: String,
    /// Socket endpoint URL.
    pub socket_url: String,
    /// Bearer token, if signed in.
    pub token: Option<String>,
    /// Debounce window for session list fetches and session creation.
    pub debounce: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/api".to_string(),
            socket_url: "ws://localhost:8080/socket".to_string(),
            token: None,
            debounce: ChatConfig::default().debounce,
        }
    }
}

impl ClientConfig {
    /// Chat feature settings derived from this configuration.
    pub fn chat(&self) -> ChatConfig {
        ChatConfig { debounce: self.debounce }
    }
}
