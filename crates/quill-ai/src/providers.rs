//! Provider and service configuration
//!
//! Defines the closed set of wire dialects, authentication schemes, and the
//! per-service configuration consumed by the formatter, normalizer, and
//! orchestrator. The tags here drive dispatch in both directions of a call.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire dialect spoken by a configured backend
///
/// Tags without a dedicated formatter or normalizer arm (including `azure`,
/// whose OpenAI-compatible endpoints accept the OpenAI body shape) fall
/// through to the OpenAI-shaped request and the multi-shape response probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
    Google,
    Meta,
    Mistral,
    Azure,
    Cohere,
    Qwen,
    DeepSeek,
    Perplexity,
    Ollama,
    LmStudio,
    LocalAi,
    KoboldAi,
    /// Catch-all for user-defined endpoints; also absorbs unknown tags
    #[serde(other)]
    Custom,
}

impl ProviderKind {
    /// All provider tags, cloud providers first, then local runtimes
    pub fn all() -> &'static [ProviderKind] {
        &[
            ProviderKind::OpenAi,
            ProviderKind::Anthropic,
            ProviderKind::Google,
            ProviderKind::Meta,
            ProviderKind::Mistral,
            ProviderKind::Azure,
            ProviderKind::Cohere,
            ProviderKind::Qwen,
            ProviderKind::DeepSeek,
            ProviderKind::Perplexity,
            ProviderKind::Ollama,
            ProviderKind::LmStudio,
            ProviderKind::LocalAi,
            ProviderKind::KoboldAi,
            ProviderKind::Custom,
        ]
    }

    /// The tag as it appears in persisted settings
    pub fn tag(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Meta => "meta",
            ProviderKind::Mistral => "mistral",
            ProviderKind::Azure => "azure",
            ProviderKind::Cohere => "cohere",
            ProviderKind::Qwen => "qwen",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Perplexity => "perplexity",
            ProviderKind::Ollama => "ollama",
            ProviderKind::LmStudio => "lmstudio",
            ProviderKind::LocalAi => "localai",
            ProviderKind::KoboldAi => "koboldai",
            ProviderKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// How the API key is sent in requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AuthType {
    /// `Authorization: Bearer <key>` header (OpenAI style)
    #[default]
    Bearer,
    /// `api-key: <key>` header; Google instead uses `x-goog-api-key`
    ApiKey,
    /// Authentication carried entirely by the service's own headers map
    Custom,
    /// No authentication header at all
    None,
}

/// One configured backend
///
/// `provider`, `auth_type`, and `is_local` are set together by the settings
/// surface, but the broker never assumes they are consistent; it re-derives
/// behavior from each field independently at call time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Display label, not semantically significant to the broker
    pub name: String,
    /// Wire endpoint
    pub url: String,
    /// Secret; may be empty for local providers
    #[serde(default)]
    pub api_key: String,
    /// Extra headers merged into every request; auth headers win on conflict
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Which authentication header to synthesize
    #[serde(default)]
    pub auth_type: AuthType,
    /// Default model for this service; overridable per call
    pub model: String,
    /// Wire dialect
    #[serde(default)]
    pub provider: ProviderKind,
    /// When true, API-key checks and auth headers are skipped entirely
    #[serde(default)]
    pub is_local: bool,
}

impl ServiceConfig {
    /// Masked API key for display in the settings surface
    pub fn masked_api_key(&self) -> String {
        mask_api_key(&self.api_key)
    }
}

/// Mask an API key for display
///
/// Keys of 8 characters or fewer are returned unmasked; longer keys keep
/// the first and last 4 characters around a `...` elision.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return key.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
