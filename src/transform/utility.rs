use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as Json;

use super::error::TransformError;
use super::transformer::{Transformer, lock};
use crate::buffer::{Buffer, BufferConfig};
use crate::message::Message;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UtilityErrSettings {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UtilityControlSettings {
    #[serde(default)]
    pub batch: BufferConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UtilityMessageSettings {
    pub value: Json,
}

/// Drops every data message
pub struct UtilityDrop;

#[async_trait]
impl Transformer for UtilityDrop {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        if message.is_control() {
            return Ok(vec![message]);
        }
        Ok(Vec::new())
    }
}

/// Fails on every data message
pub struct UtilityErr {
    message: String,
}

impl UtilityErr {
    pub fn new(settings: UtilityErrSettings) -> Self {
        let message = if settings.message.is_empty() {
            "error".to_string()
        } else {
            settings.message
        };
        Self { message }
    }
}

#[async_trait]
impl Transformer for UtilityErr {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        if message.is_control() {
            return Ok(vec![message]);
        }
        Err(TransformError::failed("utility_err", &self.message))
    }
}

/// Emits a control message whenever its batch fills
pub struct UtilityControl {
    buffer: Mutex<Buffer<Vec<u8>>>,
}

impl UtilityControl {
    pub fn new(settings: UtilityControlSettings) -> Self {
        Self {
            buffer: Mutex::new(Buffer::new(&settings.batch)),
        }
    }
}

#[async_trait]
impl Transformer for UtilityControl {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        if message.is_control() {
            return Ok(vec![message]);
        }

        let mut buffer = lock(&self.buffer);
        let rejected = match buffer.try_add(message.data().to_vec()) {
            Ok(()) => return Ok(vec![message]),
            Err(rejected) => rejected,
        };

        buffer.reset();
        if let Err(rejected) = buffer.try_add(rejected.into_inner()) {
            let item = rejected.into_inner();
            return Err(crate::buffer::BufferError::ItemTooLarge {
                size: item.len(),
                max: buffer.max_size(),
            }
            .into());
        }
        Ok(vec![message, Message::control()])
    }
}

/// Emits a literal message when a control message arrives
pub struct UtilityMessage {
    data: Vec<u8>,
}

impl UtilityMessage {
    pub fn new(settings: UtilityMessageSettings) -> Self {
        let data = match settings.value {
            Json::String(s) => s.into_bytes(),
            other => other.to_string().into_bytes(),
        };
        Self { data }
    }
}

#[async_trait]
impl Transformer for UtilityMessage {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        if !message.is_control() {
            return Ok(vec![message]);
        }
        Ok(vec![Message::new().with_data(self.data.clone()), message])
    }
}
