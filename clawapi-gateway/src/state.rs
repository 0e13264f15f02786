use std::collections::HashMap;
use std::sync::Arc;

use clawapi_core::{Config, Paths, ProviderRegistry, SessionStore};
use tracing::info;

use crate::providers::{AdapterOptions, ProtocolAdapter, RelayError, adapter_for};
use crate::runtime::ProviderRuntime;
use crate::serializer::RequestSerializer;

/// Shared application state
pub struct AppState {
    pub registry: ProviderRegistry,
    pub store: SessionStore,
    pub paths: Paths,
    pub runtime: Arc<ProviderRuntime>,
    pub serializer: RequestSerializer,
    adapters: HashMap<String, Arc<dyn ProtocolAdapter>>,
    /// Namespace accepted in front of provider names (`clawapi/claude`)
    pub model_prefix: String,
}

impl AppState {
    pub fn new(
        registry: ProviderRegistry,
        paths: Paths,
        runtime: ProviderRuntime,
        adapters: Vec<Arc<dyn ProtocolAdapter>>,
        model_prefix: impl Into<String>,
        cycle_timeout: Option<std::time::Duration>,
    ) -> Self {
        let runtime = Arc::new(runtime);
        Self {
            registry,
            store: SessionStore::new(paths.sessions_dir()),
            paths,
            serializer: RequestSerializer::new(Arc::clone(&runtime), cycle_timeout),
            runtime,
            adapters: adapters
                .into_iter()
                .map(|a| (a.provider().to_string(), a))
                .collect(),
            model_prefix: model_prefix.into(),
        }
    }

    /// Build the production state: builtin registry, sessions from disk, one
    /// adapter per registered provider.
    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        let registry = ProviderRegistry::builtin();
        let store = SessionStore::new(config.paths.sessions_dir());
        let runtime = ProviderRuntime::initialize(&registry, &store, &config.paths);

        let options = AdapterOptions {
            connect_timeout: Some(config.settings.relay.connect_timeout()),
            dump_dir: config
                .settings
                .logging
                .dump_queries
                .then(|| config.paths.logs_dir().join("queries")),
        };
        if let Some(dir) = &options.dump_dir {
            info!("Query dumps enabled in {}", dir.display());
        }

        let adapters = registry
            .iter()
            .map(|descriptor| adapter_for(descriptor, &options))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            registry,
            config.paths.clone(),
            runtime,
            adapters,
            config.settings.gateway.model_prefix.clone(),
            config.settings.relay.cycle_timeout(),
        ))
    }

    pub fn adapter(&self, provider: &str) -> Option<Arc<dyn ProtocolAdapter>> {
        self.adapters.get(provider).cloned()
    }
}
