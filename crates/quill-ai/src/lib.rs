//! Quill AI - credential and endpoint broker for LLM HTTP APIs
//!
//! Centralizes API keys, model choices, and endpoint configuration for
//! multiple providers (cloud and local), and exposes a single invocation
//! surface that other Quill extensions call instead of each maintaining
//! its own provider integration:
//! - Provider-specific request formatting and response normalization
//! - Header synthesis per auth scheme (bearer, api-key, custom, none)
//! - Timeout-guarded invocation with a single error channel
//! - Persisted settings with change notification for in-process consumers

pub mod client;
pub mod constants;
pub mod error;
pub mod format;
pub mod host;
pub mod normalize;
pub mod notify;
pub mod providers;
pub mod settings;
pub mod transport;

// Re-exports for convenience
pub use client::{AiBroker, RequestOptions};
pub use error::BrokerError;
pub use host::ListenerHandle;
pub use normalize::AiResponse;
pub use notify::{Notifier, TracingNotifier};
pub use providers::{AuthType, ProviderKind, ServiceConfig};
pub use settings::{JsonFileStore, MemoryStore, Settings, SettingsStore};
pub use transport::{HttpResponse, ReqwestTransport, Transport};
