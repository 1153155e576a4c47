use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::warn;

use super::concurrent::MemoryKvStore;
use super::traits::KvStore;
use crate::config::{ConfigError, StoreConfig, decode_settings};

/// Client handles injected into transform constructors
///
/// Built once per configuration and shared by every stage; nothing is
/// looked up from process-wide state.
#[derive(Clone, Default)]
pub struct Resources {
    stores: HashMap<String, Arc<dyn KvStore>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured store
    pub fn from_config(stores: &BTreeMap<String, StoreConfig>) -> Result<Self, ConfigError> {
        let mut resources = Self::new();
        for (name, config) in stores {
            let store = build_store(config)?;
            resources.stores.insert(name.clone(), store);
        }
        Ok(resources)
    }

    /// Register a store handle under a name
    pub fn with_store(mut self, name: impl Into<String>, store: Arc<dyn KvStore>) -> Self {
        self.stores.insert(name.into(), store);
        self
    }

    /// Look up a store by name; a missing store is a configuration error
    pub fn store(&self, name: &str) -> Result<Arc<dyn KvStore>, ConfigError> {
        self.stores
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::MissingStore(name.to_string()))
    }

    pub fn store_names(&self) -> impl Iterator<Item = &str> {
        self.stores.keys().map(String::as_str)
    }

    /// Close every store, logging failures
    pub async fn close(&self) {
        for (name, store) in &self.stores {
            if let Err(e) = store.close().await {
                warn!(store = %name, error = %e, "Failed to close KV store");
            }
        }
    }
}

impl std::fmt::Debug for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.store_names().collect();
        names.sort_unstable();
        f.debug_struct("Resources").field("stores", &names).finish()
    }
}

/// Construct a store from its `{type, settings}` configuration
pub fn build_store(config: &StoreConfig) -> Result<Arc<dyn KvStore>, ConfigError> {
    match config.kind.as_str() {
        "memory" => Ok(Arc::new(MemoryKvStore::with_settings(decode_settings(
            &config.kind,
            &config.settings,
        )?))),
        other => Err(ConfigError::UnknownStore(other.to_string())),
    }
}
