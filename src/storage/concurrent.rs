use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::Value as Json;
use tracing::debug;

use super::error::StorageError;
use super::traits::KvStore;
use crate::config::deserialize_duration;

const DEFAULT_CAPACITY: usize = 1024;

/// Settings for the `memory` store type
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryStoreSettings {
    /// Maximum number of values; zero means 1024
    #[serde(default)]
    pub capacity: usize,

    /// Expiry applied by `set`; values written with `set_with_ttl` use their own
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub ttl: Option<Duration>,
}

struct Slot {
    value: Json,
    expires: Option<Instant>,
    touched: u64,
}

impl Slot {
    fn expired(&self, now: Instant) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

/// Concurrent in-memory store using DashMap
///
/// Least recently used values are evicted once the store exceeds its
/// capacity. Expired values are dropped lazily on read.
pub struct MemoryKvStore {
    capacity: usize,
    default_ttl: Option<Duration>,
    clock: AtomicU64,
    entries: DashMap<String, Slot>,
}

impl MemoryKvStore {
    /// Create a new empty store with the default capacity
    pub fn new() -> Self {
        Self::with_settings(MemoryStoreSettings::default())
    }

    pub fn with_settings(settings: MemoryStoreSettings) -> Self {
        let capacity = if settings.capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            settings.capacity
        };
        Self {
            capacity,
            default_ttl: settings.ttl,
            clock: AtomicU64::new(0),
            entries: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn insert(&self, key: &str, value: Json, expires: Option<Instant>) {
        let slot = Slot {
            value,
            expires,
            touched: self.tick(),
        };
        let replaced = self.entries.insert(key.to_string(), slot).is_some();
        if !replaced && self.entries.len() > self.capacity {
            self.evict_oldest();
        }
    }

    fn evict_oldest(&self) {
        // Shard guards must be released before removing.
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().touched)
            .map(|e| e.key().clone());

        if let Some(key) = oldest {
            debug!(key, "Evicting least recently used value");
            self.entries.remove(&key);
        }
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Json>, StorageError> {
        let now = Instant::now();
        let found = match self.entries.get_mut(key) {
            Some(mut slot) if !slot.expired(now) => {
                slot.touched = self.tick();
                Some(slot.value.clone())
            }
            Some(_) => None,
            None => return Ok(None),
        };

        if found.is_none() {
            self.entries.remove_if(key, |_, slot| slot.expired(now));
        }
        Ok(found)
    }

    async fn set(&self, key: &str, value: Json) -> Result<(), StorageError> {
        let expires = self.default_ttl.map(|ttl| Instant::now() + ttl);
        self.insert(key, value, expires);
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: Json, ttl: Duration) -> Result<(), StorageError> {
        self.insert(key, value, Some(Instant::now() + ttl));
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.entries.clear();
        Ok(())
    }
}
