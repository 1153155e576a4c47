use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as Json;

use super::error::TransformError;
use super::transformer::Transformer;
use crate::config::{ConfigError, ObjectSettings};
use crate::message::{Field, Key, Message, bytes_to_json};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectCopySettings {
    #[serde(default)]
    pub object: ObjectSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectDeleteSettings {
    #[serde(default)]
    pub object: ObjectSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectInsertSettings {
    #[serde(default)]
    pub object: ObjectSettings,
    #[serde(default)]
    pub value: Json,
}

/// Copies a value between locations
///
/// Without a source the whole payload is copied into the target; without a
/// target the source value replaces the payload.
pub struct ObjectCopy {
    source: Option<Key>,
    target: Option<Key>,
}

impl ObjectCopy {
    pub fn new(settings: ObjectCopySettings) -> Result<Self, ConfigError> {
        let source = settings.object.source().cloned();
        let target = settings.object.target().cloned();
        if source.is_none() && target.is_none() {
            return Err(ConfigError::invalid(
                "object_copy",
                "one of object.source_key or object.target_key is required",
            ));
        }
        Ok(Self { source, target })
    }
}

#[async_trait]
impl Transformer for ObjectCopy {
    async fn transform(&self, mut message: Message) -> Result<Vec<Message>, TransformError> {
        if message.is_control() {
            return Ok(vec![message]);
        }

        match (&self.source, &self.target) {
            (Some(source), target) => {
                let value = message.get(source);
                if !value.exists() {
                    return Ok(vec![message]);
                }
                match target {
                    Some(target) => message.set(target, value.into_json())?,
                    None => message.set_data(value.to_bytes()),
                }
            }
            (None, Some(target)) => {
                let value = bytes_to_json(message.data());
                // A scalar payload cannot hold a path, so it is wrapped instead.
                if target.field() == Field::Data && !(value.is_object() || value.is_array()) {
                    message.set_data(Vec::new());
                }
                message.set(target, value)?;
            }
            (None, None) => {}
        }
        Ok(vec![message])
    }
}

/// Removes a value
pub struct ObjectDelete {
    source: Key,
}

impl ObjectDelete {
    pub fn new(settings: ObjectDeleteSettings) -> Result<Self, ConfigError> {
        let source = settings
            .object
            .source()
            .cloned()
            .ok_or_else(|| ConfigError::invalid("object_delete", "object.source_key is required"))?;
        Ok(Self { source })
    }
}

#[async_trait]
impl Transformer for ObjectDelete {
    async fn transform(&self, mut message: Message) -> Result<Vec<Message>, TransformError> {
        message.delete(&self.source)?;
        Ok(vec![message])
    }
}

/// Inserts a literal value
pub struct ObjectInsert {
    target: Key,
    value: Json,
}

impl ObjectInsert {
    pub fn new(settings: ObjectInsertSettings) -> Result<Self, ConfigError> {
        let target = settings
            .object
            .target()
            .cloned()
            .ok_or_else(|| ConfigError::invalid("object_insert", "object.target_key is required"))?;
        Ok(Self {
            target,
            value: settings.value,
        })
    }
}

#[async_trait]
impl Transformer for ObjectInsert {
    async fn transform(&self, mut message: Message) -> Result<Vec<Message>, TransformError> {
        message.set(&self.target, self.value.clone())?;
        Ok(vec![message])
    }
}
