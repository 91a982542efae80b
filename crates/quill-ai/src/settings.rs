//! Broker settings and persistence
//!
//! Settings are loaded once at startup, shallow-merged over hard-coded
//! defaults (missing top-level keys are backfilled; nested service entries
//! are replaced wholesale, never deep-merged), mutated in place by
//! configuration operations, and persisted after every mutation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants;
use crate::providers::{AuthType, ProviderKind, ServiceConfig};

/// Process-wide broker configuration
///
/// Services are keyed by id in a `BTreeMap` so registry scans (model
/// routing, active-service lookup) iterate in a deterministic order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Id of the service used when a call does not route elsewhere
    #[serde(default = "default_active_service")]
    pub active_service: String,
    /// All configured services, id -> config; never empty
    #[serde(default = "default_services")]
    pub services: BTreeMap<String, ServiceConfig>,
    /// Global sampling temperature default (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Global max output tokens default
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-call timeout in milliseconds
    #[serde(rename = "timeout", default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_active_service() -> String {
    "openai".to_string()
}

fn default_services() -> BTreeMap<String, ServiceConfig> {
    BTreeMap::from([(
        "openai".to_string(),
        ServiceConfig {
            name: "OpenAI".to_string(),
            url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: String::new(),
            headers: Default::default(),
            auth_type: AuthType::Bearer,
            model: "gpt-4o-mini".to_string(),
            provider: ProviderKind::OpenAi,
            is_local: false,
        },
    )])
}

fn default_temperature() -> f64 {
    constants::defaults::TEMPERATURE
}

fn default_max_tokens() -> u32 {
    constants::defaults::MAX_TOKENS
}

fn default_timeout_ms() -> u64 {
    constants::defaults::TIMEOUT_MS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            active_service: default_active_service(),
            services: default_services(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Settings {
    /// The currently active service, if its id resolves
    pub fn active(&self) -> Option<&ServiceConfig> {
        self.services.get(&self.active_service)
    }

    /// Resolve the effective service for a call
    ///
    /// Starts from the active service. When the caller requests a model the
    /// active service does not host, the registry is scanned in key order
    /// and the first service configured for that model wins. Falls back to
    /// the active service when no other service hosts the model.
    pub fn resolve(&self, requested_model: Option<&str>) -> Option<&ServiceConfig> {
        let active = self.active()?;
        if let Some(model) = requested_model {
            if model != active.model {
                if let Some(hit) = self.services.values().find(|s| s.model == model) {
                    return Some(hit);
                }
            }
        }
        Some(active)
    }

    /// Load settings from a store, shallow-merged over defaults
    ///
    /// Missing top-level keys are backfilled via serde defaults. A missing,
    /// unreadable, or malformed blob falls back to full defaults rather
    /// than failing startup. An empty services map is also replaced with
    /// defaults so the registry is never empty.
    pub fn load_from(store: &dyn SettingsStore) -> Settings {
        let mut settings = match store.load() {
            Ok(Some(blob)) => match serde_json::from_value::<Settings>(blob) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Malformed settings blob, using defaults: {e}");
                    Settings::default()
                }
            },
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("Failed to load settings, using defaults: {e}");
                Settings::default()
            }
        };
        if settings.services.is_empty() {
            warn!("Settings contained no services, restoring defaults");
            settings.services = default_services();
            settings.active_service = default_active_service();
        }
        settings
    }
}

/// Persistence seam for the settings blob
///
/// The broker never talks to storage directly; the host supplies an
/// implementation of this trait.
pub trait SettingsStore: Send + Sync {
    /// Load the raw settings blob, `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<Value>>;

    /// Persist the settings
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// JSON-file settings store
///
/// Uses the atomic write-to-temp-file-then-rename pattern to prevent
/// corruption. On Unix the file carries 0600 permissions because it holds
/// API keys.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location under the user's config directory
    pub fn at_default_path() -> Self {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(
            base.join(constants::app::CONFIG_DIR_NAME)
                .join(constants::app::SETTINGS_FILE),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let contents = serde_json::to_string_pretty(settings)?;
        fs::write(&temp_path, contents)?;

        // The blob holds API keys; restrict before it becomes visible
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = fs::metadata(&temp_path)?.permissions();
            permissions.set_mode(0o600);
            fs::set_permissions(&temp_path, permissions)?;
        }

        fs::rename(&temp_path, &self.path)?;
        debug!("Settings saved atomically to {:?}", self.path);
        Ok(())
    }
}

/// In-memory settings store for tests and ephemeral embedders
#[derive(Default)]
pub struct MemoryStore {
    blob: Mutex<Option<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the store with a blob, as if a previous session saved it
    pub fn with_blob(blob: Value) -> Self {
        Self {
            blob: Mutex::new(Some(blob)),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Option<Value>> {
        Ok(self.blob.lock().clone())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        *self.blob.lock() = Some(serde_json::to_value(settings)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_are_non_empty_and_in_range() {
        let settings = Settings::default();
        assert!(!settings.services.is_empty());
        assert!(settings.services.contains_key(&settings.active_service));
        assert_eq!(settings.temperature, 0.7);
        assert_eq!(settings.max_tokens, 2000);
        assert_eq!(settings.timeout_ms, 10_000);
    }

    #[test]
    fn test_shallow_merge_backfills_missing_keys() {
        let store = MemoryStore::with_blob(json!({ "temperature": 0.2 }));
        let settings = Settings::load_from(&store);
        assert_eq!(settings.temperature, 0.2);
        // Missing top-level keys come from defaults
        assert_eq!(settings.max_tokens, 2000);
        assert_eq!(settings.timeout_ms, 10_000);
        assert!(!settings.services.is_empty());
    }

    #[test]
    fn test_services_replace_wholesale_not_deep_merged() {
        let store = MemoryStore::with_blob(json!({
            "activeService": "local",
            "services": {
                "local": {
                    "name": "Ollama",
                    "url": "http://localhost:11434/api/chat",
                    "model": "llama3",
                    "provider": "ollama",
                    "isLocal": true
                }
            }
        }));
        let settings = Settings::load_from(&store);
        // The default "openai" entry must NOT survive a persisted services map
        assert_eq!(settings.services.len(), 1);
        assert!(settings.services.contains_key("local"));
    }

    #[test]
    fn test_malformed_blob_falls_back_to_defaults() {
        let store = MemoryStore::with_blob(json!({ "temperature": "hot" }));
        assert_eq!(Settings::load_from(&store), Settings::default());
    }

    #[test]
    fn test_empty_services_restored() {
        let store = MemoryStore::with_blob(json!({ "services": {} }));
        let settings = Settings::load_from(&store);
        assert!(!settings.services.is_empty());
        assert!(settings.services.contains_key(&settings.active_service));
    }

    #[test]
    fn test_resolve_prefers_service_hosting_requested_model() {
        let mut settings = Settings::default();
        let mut other = settings.services["openai"].clone();
        other.model = "m2".to_string();
        other.url = "https://b.example/v1/chat/completions".to_string();
        settings.services.insert("b".to_string(), other);

        let hit = settings.resolve(Some("m2")).unwrap();
        assert_eq!(hit.url, "https://b.example/v1/chat/completions");

        // Unknown model falls back to the active service
        let fallback = settings.resolve(Some("nope")).unwrap();
        assert_eq!(fallback.url, settings.active().unwrap().url);
    }

    #[test]
    fn test_resolve_none_when_active_id_missing() {
        let mut settings = Settings::default();
        settings.active_service = "ghost".to_string();
        assert!(settings.resolve(None).is_none());
        assert!(settings.resolve(Some("m2")).is_none());
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("settings.json"));

        assert!(store.load().unwrap().is_none());

        let mut settings = Settings::default();
        settings.max_tokens = 4096;
        store.save(&settings).unwrap();

        let loaded = Settings::load_from(&store);
        assert_eq!(loaded, settings);
        // No temp file left behind
        assert!(!dir.path().join("settings.tmp").exists());
    }

    #[test]
    fn test_timeout_serializes_as_timeout_key() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(value["timeout"], json!(10_000));
        assert!(value.get("timeoutMs").is_none());
    }
}
