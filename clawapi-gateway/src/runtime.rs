//! Per-provider runtime state built once at gateway startup.
//!
//! A provider becomes active only when it is installed and its persisted
//! session qualifies. The set is fixed for the lifetime of the process;
//! picking up new sessions requires a restart.

use std::collections::HashMap;
use std::sync::Arc;

use clawapi_core::{Paths, ProviderDescriptor, ProviderRegistry, SessionCredentials, SessionStore};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Everything a relay cycle needs for one active provider.
#[derive(Debug)]
pub struct RuntimeState {
    pub descriptor: ProviderDescriptor,
    pub credentials: SessionCredentials,
    /// Held for the whole duration of a relay cycle
    pub(crate) lock: Mutex<()>,
}

impl RuntimeState {
    pub fn new(descriptor: ProviderDescriptor, credentials: SessionCredentials) -> Self {
        Self {
            descriptor,
            credentials,
            lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// Active providers, keyed by name.
#[derive(Debug, Default)]
pub struct ProviderRuntime {
    states: HashMap<String, Arc<RuntimeState>>,
}

impl ProviderRuntime {
    pub fn from_states(states: impl IntoIterator<Item = RuntimeState>) -> Self {
        Self {
            states: states
                .into_iter()
                .map(|s| (s.descriptor.name.clone(), Arc::new(s)))
                .collect(),
        }
    }

    /// Load every installed provider with a qualifying session.
    ///
    /// Providers that fail are skipped with a log line; startup never aborts
    /// because of a single bad session.
    pub fn initialize(registry: &ProviderRegistry, store: &SessionStore, paths: &Paths) -> Self {
        let mut states = Vec::new();

        for descriptor in registry.iter() {
            if !paths.is_installed(&descriptor.name) {
                continue;
            }
            match store.load(descriptor) {
                Ok(credentials) => {
                    info!("Provider '{}' active", descriptor.name);
                    states.push(RuntimeState::new(descriptor.clone(), credentials));
                }
                Err(e) => warn!("Skipping provider '{}': {}", descriptor.name, e),
            }
        }

        let runtime = Self::from_states(states);
        if runtime.is_empty() {
            warn!("No active providers. Install one with: clawapi add <provider>");
        }
        runtime
    }

    pub fn get(&self, provider: &str) -> Option<Arc<RuntimeState>> {
        self.states.get(provider).cloned()
    }

    pub fn is_active(&self, provider: &str) -> bool {
        self.states.contains_key(provider)
    }

    pub fn active_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.states.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_cookies(store: &SessionStore, provider: &str, names: &[&str]) {
        let dir = store.session_dir(provider);
        fs::create_dir_all(&dir).unwrap();
        let cookies: Vec<_> = names
            .iter()
            .map(|n| serde_json::json!({"name": n, "value": "v"}))
            .collect();
        fs::write(dir.join("cookies.json"), serde_json::to_string(&cookies).unwrap()).unwrap();
    }

    #[test]
    fn test_initialize_requires_install_and_valid_session() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(dir.path());
        paths.ensure_dirs().unwrap();
        let store = SessionStore::new(paths.sessions_dir());
        let registry = ProviderRegistry::builtin();

        // Valid session but not installed
        write_cookies(&store, "claude", &["sessionKey"]);
        assert!(ProviderRuntime::initialize(&registry, &store, &paths).is_empty());

        // Installed with a session that does not qualify
        paths.set_installed("chatgpt").unwrap();
        write_cookies(&store, "chatgpt", &["_ga", "_gid"]);

        paths.set_installed("claude").unwrap();
        let runtime = ProviderRuntime::initialize(&registry, &store, &paths);

        assert_eq!(runtime.active_names(), vec!["claude".to_string()]);
        assert!(runtime.is_active("claude"));
        assert!(!runtime.is_active("chatgpt"));
        let state = runtime.get("claude").unwrap();
        assert_eq!(state.name(), "claude");
        assert_eq!(state.credentials.cookie_header, "sessionKey=v");
    }
}
