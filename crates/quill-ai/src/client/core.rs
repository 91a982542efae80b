//! Broker core
//!
//! The [`AiBroker`] struct plus header synthesis and HTTP error mapping.
//! The orchestration algorithm itself lives in `invoke.rs`.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::constants;
use crate::error::BrokerError;
use crate::host::Listener;
use crate::notify::{Notifier, TracingNotifier};
use crate::providers::{AuthType, ProviderKind, ServiceConfig};
use crate::settings::{JsonFileStore, Settings, SettingsStore};
use crate::transport::{HttpResponse, ReqwestTransport, Transport};

/// Per-call overrides; every field falls back to service/global defaults
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
}

/// Credential and endpoint broker for LLM HTTP APIs
///
/// Holds the settings registry and the collaborator seams (persistence,
/// notification, network). One instance serves all in-process consumers;
/// concurrent invocations are independent and share no request state.
pub struct AiBroker {
    pub(crate) settings: RwLock<Settings>,
    pub(crate) store: Arc<dyn SettingsStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) listeners: Arc<RwLock<Vec<Listener>>>,
    pub(crate) next_listener_id: AtomicU64,
}

impl AiBroker {
    /// Create a broker with explicit collaborators, loading settings from
    /// the store (shallow-merged over defaults)
    pub fn new(
        store: Arc<dyn SettingsStore>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let settings = Settings::load_from(store.as_ref());
        Self {
            settings: RwLock::new(settings),
            store,
            notifier,
            transport,
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Broker wired with the production collaborators: JSON file store at
    /// the default path, reqwest transport, log-backed notifier
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(JsonFileStore::at_default_path()),
            Arc::new(ReqwestTransport::new()),
            Arc::new(TracingNotifier),
        )
    }
}

/// Set a header, replacing any existing value under the same
/// case-insensitive name
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value));
}

/// Synthesize the header set for a service
///
/// Starts from `Content-Type: application/json`, merges the service's own
/// headers over it, then the auth header over both. Local services get no
/// authentication header regardless of `auth_type`.
pub(crate) fn build_headers(service: &ServiceConfig) -> Vec<(String, String)> {
    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    for (name, value) in &service.headers {
        set_header(&mut headers, name, value.clone());
    }

    if service.is_local {
        return headers;
    }

    match service.auth_type {
        AuthType::Bearer => {
            debug!("Using Bearer authentication for {}", service.provider);
            set_header(
                &mut headers,
                "Authorization",
                format!("Bearer {}", service.api_key),
            );
            // OpenRouter's gateway policy requires caller identification
            if service.url.contains("openrouter.ai") {
                set_header(
                    &mut headers,
                    "HTTP-Referer",
                    constants::app::HTTP_REFERER.to_string(),
                );
                set_header(&mut headers, "X-Title", constants::app::APP_TITLE.to_string());
            }
        }
        AuthType::ApiKey => {
            let name = if service.provider == ProviderKind::Google {
                "x-goog-api-key"
            } else {
                "api-key"
            };
            debug!("Using {} header authentication", name);
            set_header(&mut headers, name, service.api_key.clone());
        }
        // The service's own headers map is assumed sufficient
        AuthType::Custom | AuthType::None => {}
    }

    headers
}

/// Map a non-success response to the clearest available error
///
/// Prefers a provider-embedded error message; absence of a parseable body
/// is tolerated and falls back to a generic status-code message.
pub(crate) fn protocol_error(response: &HttpResponse) -> BrokerError {
    if let Ok(body) = response.json() {
        let embedded = body
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .or_else(|| body.get("error").and_then(|e| e.as_str()))
            .or_else(|| body.get("message").and_then(|m| m.as_str()));
        if let Some(message) = embedded {
            return BrokerError::Provider(message.to_string());
        }
    }
    BrokerError::HttpStatus(response.status)
}
