//! In-process capability surface and broker registry
//!
//! The broker exposes a small stable capability set to independent,
//! decoupled in-process consumers. Rather than an ambient global lookup,
//! consumers obtain an `Arc<AiBroker>` handle from an explicit
//! process-wide registry with install/uninstall lifecycle calls; a missing
//! handle means "not installed" and consumers degrade accordingly.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::{Arc, LazyLock, Weak};

use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use tracing::{error, info};

use crate::client::{AiBroker, RequestOptions};
use crate::error::BrokerError;
use crate::providers::ServiceConfig;
use crate::settings::Settings;

/// One registered configuration-change callback
pub(crate) struct Listener {
    pub(crate) id: u64,
    pub(crate) callback: Arc<dyn Fn(Settings) + Send + Sync>,
}

/// Deregistration handle returned by [`AiBroker::on_configuration_change`]
pub struct ListenerHandle {
    id: u64,
    listeners: Weak<RwLock<Vec<Listener>>>,
}

impl ListenerHandle {
    /// Deregister the callback; a no-op if the broker is already gone
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.write().retain(|l| l.id != self.id);
        }
    }
}

impl AiBroker {
    /// Snapshot of the current settings
    ///
    /// Returns an owned copy; mutating it does not affect broker state.
    pub fn get_current_configuration(&self) -> Settings {
        self.settings.read().clone()
    }

    /// True iff the active service is local, or has both a non-empty id
    /// and a non-empty API key
    pub fn is_configured(&self) -> bool {
        let settings = self.settings.read();
        match settings.active() {
            Some(service) => {
                service.is_local
                    || (!settings.active_service.is_empty() && !service.api_key.is_empty())
            }
            None => false,
        }
    }

    /// Invocation entry point for in-process consumers
    pub async fn invoke_ai(
        &self,
        prompt: &str,
        options: &RequestOptions,
    ) -> Result<String, BrokerError> {
        self.invoke(prompt, options).await
    }

    /// Register a callback fired with a settings snapshot after every
    /// persisted mutation
    pub fn on_configuration_change(
        &self,
        callback: impl Fn(Settings) + Send + Sync + 'static,
    ) -> ListenerHandle {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.write().push(Listener {
            id,
            callback: Arc::new(callback),
        });
        ListenerHandle {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Apply a mutation, persist the result, and notify listeners
    pub fn update_settings(&self, mutate: impl FnOnce(&mut Settings)) -> Result<()> {
        let snapshot = {
            let mut guard = self.settings.write();
            mutate(&mut guard);
            guard.clone()
        };
        self.store.save(&snapshot)?;
        self.notify_listeners(snapshot);
        Ok(())
    }

    /// Switch the active service
    pub fn set_active_service(&self, id: &str) -> Result<()> {
        if !self.settings.read().services.contains_key(id) {
            return Err(anyhow!("unknown service id: {id}"));
        }
        self.update_settings(|s| s.active_service = id.to_string())
    }

    /// Add or replace a service entry
    pub fn upsert_service(&self, id: &str, config: ServiceConfig) -> Result<()> {
        self.update_settings(|s| {
            s.services.insert(id.to_string(), config);
        })
    }

    /// Remove a service
    ///
    /// The registry is never left empty; removing the last service is
    /// refused. Removing the active service promotes the first remaining
    /// entry.
    pub fn remove_service(&self, id: &str) -> Result<()> {
        {
            let settings = self.settings.read();
            if !settings.services.contains_key(id) {
                return Err(anyhow!("unknown service id: {id}"));
            }
            if settings.services.len() == 1 {
                return Err(anyhow!("cannot remove the last configured service"));
            }
        }
        self.update_settings(|s| {
            s.services.remove(id);
            if s.active_service == id {
                if let Some(first) = s.services.keys().next() {
                    s.active_service = first.clone();
                }
            }
        })
    }

    /// Fire all listeners with a snapshot, best effort
    ///
    /// A panicking callback must not prevent the others from running.
    fn notify_listeners(&self, snapshot: Settings) {
        let callbacks: Vec<Arc<dyn Fn(Settings) + Send + Sync>> = self
            .listeners
            .read()
            .iter()
            .map(|l| Arc::clone(&l.callback))
            .collect();
        for callback in callbacks {
            let settings = snapshot.clone();
            if catch_unwind(AssertUnwindSafe(|| callback(settings))).is_err() {
                error!("Configuration change listener panicked");
            }
        }
    }
}

/// Installed broker handle, `None` until [`install`] runs
static GLOBAL: LazyLock<RwLock<Option<Arc<AiBroker>>>> = LazyLock::new(|| RwLock::new(None));

/// Install a broker as the process-wide instance
pub fn install(broker: Arc<AiBroker>) {
    *GLOBAL.write() = Some(broker);
    info!("AI broker installed");
}

/// Remove the process-wide broker, if any
pub fn uninstall() {
    *GLOBAL.write() = None;
    info!("AI broker uninstalled");
}

/// The installed broker, `None` when not installed
pub fn global() -> Option<Arc<AiBroker>> {
    GLOBAL.read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    use crate::notify::TracingNotifier;
    use crate::providers::{AuthType, ProviderKind};
    use crate::settings::{MemoryStore, SettingsStore};
    use crate::transport::{HttpResponse, Transport};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct NoopTransport;

    #[async_trait]
    impl Transport for NoopTransport {
        async fn post(
            &self,
            _url: &str,
            _headers: &[(String, String)],
            _body: &Value,
        ) -> anyhow::Result<HttpResponse> {
            Ok(HttpResponse::new(200, "{}"))
        }
    }

    fn broker() -> AiBroker {
        AiBroker::new(
            Arc::new(MemoryStore::new()),
            Arc::new(NoopTransport),
            Arc::new(TracingNotifier),
        )
    }

    fn local_service() -> ServiceConfig {
        ServiceConfig {
            name: "Ollama".to_string(),
            url: "http://localhost:11434/api/chat".to_string(),
            api_key: String::new(),
            headers: HashMap::new(),
            auth_type: AuthType::None,
            model: "llama3".to_string(),
            provider: ProviderKind::Ollama,
            is_local: true,
        }
    }

    #[test]
    fn test_configuration_copy_semantics() {
        let broker = broker();
        let first = broker.get_current_configuration();
        let mut second = broker.get_current_configuration();
        assert_eq!(first, second);

        second.temperature = 0.0;
        second.services.clear();
        // Internal state unaffected by mutating the returned copy
        assert_eq!(broker.get_current_configuration(), first);
    }

    #[test]
    fn test_is_configured_truth_table() {
        let broker = broker();
        // Default service has an empty API key
        assert!(!broker.is_configured());

        broker
            .update_settings(|s| {
                if let Some(svc) = s.services.get_mut("openai") {
                    svc.api_key = "sk-live".to_string();
                }
            })
            .unwrap();
        assert!(broker.is_configured());

        // Local service counts as configured with an empty key
        broker.upsert_service("local", local_service()).unwrap();
        broker.set_active_service("local").unwrap();
        assert!(broker.is_configured());

        // Dangling active id
        broker
            .update_settings(|s| s.active_service = "ghost".to_string())
            .unwrap();
        assert!(!broker.is_configured());
    }

    #[test]
    fn test_mutations_persist_through_store() {
        let store = Arc::new(MemoryStore::new());
        let broker = AiBroker::new(store.clone(), Arc::new(NoopTransport), Arc::new(TracingNotifier));
        broker
            .update_settings(|s| s.max_tokens = 512)
            .unwrap();

        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved["maxTokens"], json!(512));
    }

    #[test]
    fn test_listeners_fire_with_snapshot_and_unsubscribe() {
        let broker = broker();
        let fired = Arc::new(AtomicUsize::new(0));

        let fired_clone = fired.clone();
        let handle = broker.on_configuration_change(move |settings| {
            assert_eq!(settings.max_tokens, 999);
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        broker.update_settings(|s| s.max_tokens = 999).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        handle.unsubscribe();
        broker.update_settings(|s| s.max_tokens = 999).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_listener_does_not_starve_others() {
        let broker = broker();
        let fired = Arc::new(AtomicUsize::new(0));

        let _first = broker.on_configuration_change(|_| panic!("listener bug"));
        let fired_clone = fired.clone();
        let _second = broker.on_configuration_change(move |_| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        broker.update_settings(|s| s.temperature = 0.3).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_service_lifecycle_guards() {
        let broker = broker();
        assert!(broker.set_active_service("nope").is_err());
        assert!(broker.remove_service("nope").is_err());

        // Only one service: removal refused
        assert!(broker.remove_service("openai").is_err());

        broker.upsert_service("local", local_service()).unwrap();
        broker.set_active_service("local").unwrap();

        // Removing the active service promotes the remaining one
        broker.remove_service("local").unwrap();
        let settings = broker.get_current_configuration();
        assert_eq!(settings.active_service, "openai");
        assert_eq!(settings.services.len(), 1);
    }

    #[test]
    fn test_install_global_uninstall_lifecycle() {
        // Single test owns the process-wide registry to avoid cross-test races
        uninstall();
        assert!(global().is_none());

        let broker = Arc::new(broker());
        install(broker.clone());
        let handle = global().unwrap();
        assert!(Arc::ptr_eq(&handle, &broker));

        uninstall();
        assert!(global().is_none());
    }
}
