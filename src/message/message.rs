use serde_json::Value as Json;

use super::error::MessageError;
use super::key::{Field, Key};
use super::path::Path;
use super::value::Value;

/// The unit of data flowing through a pipeline
///
/// Data and metadata are opaque bytes, usually JSON text. A control message
/// carries no payload: it signals transforms and sinks to flush buffered
/// state, and every mutator on it is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    data: Vec<u8>,
    metadata: Vec<u8>,
    control: bool,
}

impl Message {
    /// Create an empty data message
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a control message
    pub fn control() -> Self {
        Self::new().as_control()
    }

    /// Convert into a control message, discarding data and metadata
    pub fn as_control(mut self) -> Self {
        self.data = Vec::new();
        self.metadata = Vec::new();
        self.control = true;
        self
    }

    pub fn is_control(&self) -> bool {
        self.control
    }

    /// Builder form of [`Message::set_data`]
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.set_data(data);
        self
    }

    /// Builder form of [`Message::set_metadata`]
    pub fn with_metadata(mut self, metadata: impl Into<Vec<u8>>) -> Self {
        self.set_metadata(metadata);
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: impl Into<Vec<u8>>) {
        if self.control {
            return;
        }
        self.data = data.into();
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: impl Into<Vec<u8>>) {
        if self.control {
            return;
        }
        self.metadata = metadata.into();
    }

    /// Read a value from the data
    ///
    /// Data that is not JSON text, or a malformed path, reads as missing.
    pub fn get_value(&self, path: &str) -> Value {
        read(&self.data, path)
    }

    pub fn get_meta_value(&self, path: &str) -> Value {
        read(&self.metadata, path)
    }

    /// Write a value into the data, creating intermediate containers
    pub fn set_value(&mut self, path: &str, value: impl Into<Json>) -> Result<(), MessageError> {
        if self.control {
            return Ok(());
        }
        write(&mut self.data, path, value.into())
    }

    pub fn set_meta_value(&mut self, path: &str, value: impl Into<Json>) -> Result<(), MessageError> {
        if self.control {
            return Ok(());
        }
        write(&mut self.metadata, path, value.into())
    }

    /// Write raw bytes into the data: JSON text is embedded structurally,
    /// anything else as a string
    pub fn set_value_bytes(&mut self, path: &str, bytes: &[u8]) -> Result<(), MessageError> {
        self.set_value(path, bytes_to_json(bytes))
    }

    pub fn delete_value(&mut self, path: &str) -> Result<(), MessageError> {
        if self.control {
            return Ok(());
        }
        remove(&mut self.data, path)
    }

    pub fn delete_meta_value(&mut self, path: &str) -> Result<(), MessageError> {
        if self.control {
            return Ok(());
        }
        remove(&mut self.metadata, path)
    }

    /// Read through a configured key
    pub fn get(&self, key: &Key) -> Value {
        match key.field() {
            Field::Data => self.get_value(key.path()),
            Field::Metadata => self.get_meta_value(key.path()),
        }
    }

    /// Write through a configured key
    pub fn set(&mut self, key: &Key, value: impl Into<Json>) -> Result<(), MessageError> {
        match key.field() {
            Field::Data => self.set_value(key.path(), value),
            Field::Metadata => self.set_meta_value(key.path(), value),
        }
    }

    /// Delete through a configured key
    pub fn delete(&mut self, key: &Key) -> Result<(), MessageError> {
        match key.field() {
            Field::Data => self.delete_value(key.path()),
            Field::Metadata => self.delete_meta_value(key.path()),
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.data))
    }
}

/// Interpret bytes as JSON when they parse, otherwise as a string
pub fn bytes_to_json(bytes: &[u8]) -> Json {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Json::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn read(content: &[u8], path: &str) -> Value {
    let Ok(path) = Path::parse(path) else {
        return Value::missing();
    };
    if content.is_empty() {
        return Value::missing();
    }

    match serde_json::from_slice::<Json>(content) {
        Ok(doc) => Value::from(path.get(&doc).cloned()),
        Err(_) => Value::missing(),
    }
}

fn write(content: &mut Vec<u8>, path: &str, value: Json) -> Result<(), MessageError> {
    let path = Path::parse(path)?;
    let mut doc = if content.is_empty() {
        Json::Null
    } else {
        serde_json::from_slice::<Json>(content)?
    };

    path.set(&mut doc, value)?;
    *content = serde_json::to_vec(&doc)?;
    Ok(())
}

fn remove(content: &mut Vec<u8>, path: &str) -> Result<(), MessageError> {
    let path = Path::parse(path)?;
    if content.is_empty() {
        return Ok(());
    }

    let mut doc = serde_json::from_slice::<Json>(content)?;
    path.delete(&mut doc)?;
    *content = serde_json::to_vec(&doc)?;
    Ok(())
}
