use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::error::TransformError;
use super::transformer::Transformer;
use crate::config::{ConfigError, ObjectSettings, deserialize_duration};
use crate::message::{Key, Message};
use crate::storage::KvStore;

#[derive(Debug, Clone, Deserialize)]
pub struct KvStoreItemSettings {
    /// Name of a store declared under `kv_stores`
    pub kv_store: String,
    #[serde(default)]
    pub object: ObjectSettings,
    /// Prepended to every store key as `prefix:key`
    #[serde(default)]
    pub prefix: String,
    /// Expiry for items written by `enrich_kv_store_item_set`
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub ttl_offset: Option<Duration>,
    /// Close the store when a control message arrives
    #[serde(default)]
    pub close_kv_store: bool,
}

struct KvItem {
    store: Arc<dyn KvStore>,
    source: Key,
    target: Key,
    prefix: String,
    close_on_control: bool,
}

impl KvItem {
    fn new(
        kind: &str,
        settings: &KvStoreItemSettings,
        store: Arc<dyn KvStore>,
    ) -> Result<Self, ConfigError> {
        let source = settings
            .object
            .source()
            .cloned()
            .ok_or_else(|| ConfigError::invalid(kind, "object.source_key is required"))?;
        let target = settings
            .object
            .target()
            .cloned()
            .ok_or_else(|| ConfigError::invalid(kind, "object.target_key is required"))?;
        Ok(Self {
            store,
            source,
            target,
            prefix: settings.prefix.clone(),
            close_on_control: settings.close_kv_store,
        })
    }

    /// The store key for a message, if its source value exists
    fn key(&self, message: &Message) -> Option<String> {
        let value = message.get(&self.source);
        if !value.exists() {
            return None;
        }
        let key = value.as_string();
        Some(if self.prefix.is_empty() {
            key
        } else {
            format!("{}:{key}", self.prefix)
        })
    }

    async fn on_control(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        if self.close_on_control {
            self.store.close().await?;
        }
        Ok(vec![message])
    }
}

/// Looks up the source value in a store and writes the result to the target
pub struct KvStoreItemGet {
    item: KvItem,
}

impl KvStoreItemGet {
    pub fn new(settings: KvStoreItemSettings, store: Arc<dyn KvStore>) -> Result<Self, ConfigError> {
        Ok(Self {
            item: KvItem::new("enrich_kv_store_item_get", &settings, store)?,
        })
    }
}

#[async_trait]
impl Transformer for KvStoreItemGet {
    async fn transform(&self, mut message: Message) -> Result<Vec<Message>, TransformError> {
        if message.is_control() {
            return self.item.on_control(message).await;
        }

        let Some(key) = self.item.key(&message) else {
            return Ok(vec![message]);
        };
        if let Some(value) = self.item.store.get(&key).await? {
            message.set(&self.item.target, value)?;
        }
        Ok(vec![message])
    }
}

/// Stores the target value under the source value
pub struct KvStoreItemSet {
    item: KvItem,
    ttl: Option<Duration>,
}

impl KvStoreItemSet {
    pub fn new(settings: KvStoreItemSettings, store: Arc<dyn KvStore>) -> Result<Self, ConfigError> {
        Ok(Self {
            item: KvItem::new("enrich_kv_store_item_set", &settings, store)?,
            ttl: settings.ttl_offset.filter(|d| !d.is_zero()),
        })
    }
}

#[async_trait]
impl Transformer for KvStoreItemSet {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        if message.is_control() {
            return self.item.on_control(message).await;
        }

        let Some(key) = self.item.key(&message) else {
            return Ok(vec![message]);
        };
        let value = message.get(&self.item.target).into_json();
        match self.ttl {
            Some(ttl) => self.item.store.set_with_ttl(&key, value, ttl).await?,
            None => self.item.store.set(&key, value).await?,
        }
        Ok(vec![message])
    }
}
