//! Broker constants and configuration defaults
//!
//! Centralized location for magic numbers and default values

use std::time::Duration;

/// Per-call defaults applied when neither the call nor the settings
/// override them
pub mod defaults {
    /// Default sampling temperature
    pub const TEMPERATURE: f64 = 0.7;

    /// Default maximum output tokens
    pub const MAX_TOKENS: u32 = 2000;

    /// Default per-call timeout in milliseconds
    pub const TIMEOUT_MS: u64 = 10_000;

    /// System prompt used when the caller supplies none
    pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
}

/// HTTP client configuration
pub mod http {
    use super::*;

    /// Connection timeout for HTTP requests
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// User agent sent with every request
    pub const USER_AGENT: &str = "Quill/1.0";
}

/// Host application integration
pub mod app {
    /// Config directory name under the user's home
    pub const CONFIG_DIR_NAME: &str = ".quill";

    /// Settings file name inside the config directory
    pub const SETTINGS_FILE: &str = "ai-broker.json";

    /// Referer identification header value required by OpenRouter
    pub const HTTP_REFERER: &str = "https://quill.app";

    /// Title identification header value required by OpenRouter
    pub const APP_TITLE: &str = "Quill AI";
}
