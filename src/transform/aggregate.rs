use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as Json;
use tracing::debug;

use super::error::TransformError;
use super::transformer::{Transformer, lock};
use crate::buffer::{Batch, BufferConfig, PartitionedBuffer};
use crate::config::ObjectSettings;
use crate::message::{Key, Message, bytes_to_json};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateToStringSettings {
    #[serde(default)]
    pub object: ObjectSettings,
    #[serde(default)]
    pub batch: BufferConfig,
    #[serde(default)]
    pub separator: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateToArraySettings {
    #[serde(default)]
    pub object: ObjectSettings,
    #[serde(default)]
    pub batch: BufferConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateFromArraySettings {
    #[serde(default)]
    pub object: ObjectSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateFromStringSettings {
    #[serde(default)]
    pub separator: String,
}

/// Partitioned payload buffer shared by the aggregating transforms
struct Aggregator {
    batch_key: Option<Key>,
    buffer: Mutex<PartitionedBuffer<Vec<u8>>>,
}

impl Aggregator {
    fn new(object: &ObjectSettings, batch: BufferConfig) -> Self {
        Self {
            batch_key: object.batch().cloned(),
            buffer: Mutex::new(PartitionedBuffer::new(batch)),
        }
    }

    /// Messages without a batch key value share the empty key
    fn push(&self, message: &Message) -> Result<Option<Batch<Vec<u8>>>, TransformError> {
        let key = self
            .batch_key
            .as_ref()
            .map(|k| message.get(k).as_string())
            .unwrap_or_default();
        Ok(lock(&self.buffer).push(&key, message.data().to_vec())?)
    }

    fn drain(&self) -> Vec<Batch<Vec<u8>>> {
        lock(&self.buffer).drain()
    }
}

/// Joins buffered payloads into one message with a separator
pub struct AggregateToString {
    separator: Vec<u8>,
    aggregator: Aggregator,
}

impl AggregateToString {
    pub fn new(settings: AggregateToStringSettings) -> Self {
        Self {
            separator: settings.separator.into_bytes(),
            aggregator: Aggregator::new(&settings.object, settings.batch),
        }
    }

    fn emit(&self, batch: Batch<Vec<u8>>) -> Message {
        Message::new().with_data(batch.items.join(self.separator.as_slice()))
    }
}

#[async_trait]
impl Transformer for AggregateToString {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        if message.is_control() {
            let mut output: Vec<Message> = self
                .aggregator
                .drain()
                .into_iter()
                .map(|batch| self.emit(batch))
                .collect();
            debug!(transform = "aggregate_to_string", count = output.len(), "Flushed on control");
            output.push(message);
            return Ok(output);
        }

        Ok(self
            .aggregator
            .push(&message)?
            .map(|batch| self.emit(batch))
            .into_iter()
            .collect())
    }
}

/// Collects buffered payloads into a JSON array
pub struct AggregateToArray {
    target: Option<Key>,
    aggregator: Aggregator,
}

impl AggregateToArray {
    pub fn new(settings: AggregateToArraySettings) -> Self {
        Self {
            target: settings.object.target().cloned(),
            aggregator: Aggregator::new(&settings.object, settings.batch),
        }
    }

    fn emit(&self, batch: Batch<Vec<u8>>) -> Result<Message, TransformError> {
        let array = Json::Array(batch.items.iter().map(|item| bytes_to_json(item)).collect());
        let mut message = Message::new();
        match &self.target {
            Some(key) => message.set(key, array)?,
            None => message.set_data(array.to_string()),
        }
        Ok(message)
    }
}

#[async_trait]
impl Transformer for AggregateToArray {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        if message.is_control() {
            let mut output = self
                .aggregator
                .drain()
                .into_iter()
                .map(|batch| self.emit(batch))
                .collect::<Result<Vec<_>, _>>()?;
            output.push(message);
            return Ok(output);
        }

        match self.aggregator.push(&message)? {
            Some(batch) => Ok(vec![self.emit(batch)?]),
            None => Ok(Vec::new()),
        }
    }
}

/// Expands an array into one message per element
///
/// With a source key, the array is removed from the object and every
/// element is emitted alongside the remaining fields.
pub struct AggregateFromArray {
    source: Option<Key>,
    target: Option<Key>,
}

impl AggregateFromArray {
    pub fn new(settings: AggregateFromArraySettings) -> Self {
        Self {
            source: settings.object.source().cloned(),
            target: settings.object.target().cloned(),
        }
    }
}

#[async_trait]
impl Transformer for AggregateFromArray {
    async fn transform(&self, mut message: Message) -> Result<Vec<Message>, TransformError> {
        if message.is_control() {
            return Ok(vec![message]);
        }

        let elements = match &self.source {
            Some(key) => {
                let value = message.get(key);
                message.delete(key)?;
                value.array()
            }
            None => crate::message::Value::from(bytes_to_json(message.data())).array(),
        };

        let mut output = Vec::with_capacity(elements.len());
        for element in elements {
            let mut out = Message::new().with_metadata(message.metadata().to_vec());
            if self.source.is_some() {
                out.set_data(message.data().to_vec());
            }

            match (&self.target, &self.source) {
                (Some(target), _) => out.set(target, element.into_json())?,
                // Merge the element's fields into the remaining object.
                (None, Some(_)) => {
                    for (field, value) in element.object() {
                        out.set_value(&field.replace('.', "\\."), value.into_json())?;
                    }
                }
                (None, None) => out.set_data(element.to_bytes()),
            }
            output.push(out);
        }
        Ok(output)
    }
}

/// Splits the payload on a separator into one message per piece
pub struct AggregateFromString {
    separator: String,
}

impl AggregateFromString {
    pub fn new(settings: AggregateFromStringSettings) -> Self {
        let separator = if settings.separator.is_empty() {
            "\n".to_string()
        } else {
            settings.separator
        };
        Self { separator }
    }
}

#[async_trait]
impl Transformer for AggregateFromString {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        if message.is_control() {
            return Ok(vec![message]);
        }

        let text = String::from_utf8_lossy(message.data());
        Ok(text
            .split(self.separator.as_str())
            .filter(|piece| !piece.is_empty())
            .map(|piece| {
                Message::new()
                    .with_data(piece.as_bytes().to_vec())
                    .with_metadata(message.metadata().to_vec())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::transformer::apply_all;
    use serde_json::json;
    use std::sync::Arc;

    fn inputs(items: &[&str]) -> Vec<Message> {
        items.iter().map(|s| Message::new().with_data(*s)).collect()
    }

    fn to_string(separator: &str, count: usize) -> Arc<dyn Transformer> {
        Arc::new(AggregateToString::new(AggregateToStringSettings {
            separator: separator.to_string(),
            batch: BufferConfig::new(count, 0),
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn joins_all_messages_on_flush() {
        let transforms = vec![to_string("\n", 0)];
        let out = apply_all(
            &transforms,
            inputs(&[r#"{"foo":"bar"}"#, r#"{"baz":"qux"}"#, r#"{"quux":"corge"}"#]),
        )
        .await
        .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0].data(),
            b"{\"foo\":\"bar\"}\n{\"baz\":\"qux\"}\n{\"quux\":\"corge\"}"
        );
        assert!(out[1].is_control());
    }

    #[tokio::test]
    async fn count_limit_splits_batches() {
        let transforms = vec![to_string("\n", 2)];
        let out = apply_all(
            &transforms,
            inputs(&[r#"{"foo":"bar"}"#, r#"{"baz":"qux"}"#, r#"{"quux":"corge"}"#]),
        )
        .await
        .unwrap();

        let data: Vec<_> = out.iter().filter(|m| !m.is_control()).map(|m| m.to_string()).collect();
        assert_eq!(
            data,
            vec![
                "{\"foo\":\"bar\"}\n{\"baz\":\"qux\"}".to_string(),
                "{\"quux\":\"corge\"}".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn groups_by_batch_key() {
        let transform: Arc<dyn Transformer> = Arc::new(AggregateToArray::new(AggregateToArraySettings {
            object: ObjectSettings {
                batch_key: Some(Key::data("foo")),
                ..Default::default()
            },
            ..Default::default()
        }));
        let values = ["bar", "baz", "bar", "qux", "bar"];
        let messages = values
            .iter()
            .map(|v| Message::new().with_data(json!({ "foo": v }).to_string()))
            .collect();

        let out = apply_all(&[transform], messages).await.unwrap();
        let groups: Vec<Json> = out
            .iter()
            .filter(|m| !m.is_control())
            .map(|m| serde_json::from_slice(m.data()).unwrap())
            .collect();

        assert_eq!(
            groups,
            vec![
                json!([{"foo": "bar"}, {"foo": "bar"}, {"foo": "bar"}]),
                json!([{"foo": "baz"}]),
                json!([{"foo": "qux"}]),
            ]
        );
    }

    #[tokio::test]
    async fn to_array_sets_target_key() {
        let transform = AggregateToArray::new(AggregateToArraySettings {
            object: ObjectSettings {
                target_key: Some(Key::data("items")),
                ..Default::default()
            },
            ..Default::default()
        });
        transform.transform(Message::new().with_data(r#"{"a":1}"#)).await.unwrap();
        let out = transform.transform(Message::control()).await.unwrap();
        assert_eq!(out[0].get_value("items").into_json(), json!([{"a": 1}]));
    }

    #[tokio::test]
    async fn oversized_item_is_an_error() {
        let transform = AggregateToString::new(AggregateToStringSettings {
            batch: BufferConfig::new(0, 2),
            ..Default::default()
        });
        let err = transform
            .transform(Message::new().with_data("too big"))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn from_array_expands_payload() {
        let transform = AggregateFromArray::new(AggregateFromArraySettings::default());
        let out = transform
            .transform(Message::new().with_data(r#"[{"a":1},{"b":2}]"#).with_metadata("m"))
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].data(), br#"{"a":1}"#);
        assert_eq!(out[1].metadata(), b"m");
    }

    #[tokio::test]
    async fn from_array_merges_remaining_fields() {
        let transform = AggregateFromArray::new(AggregateFromArraySettings {
            object: ObjectSettings {
                source_key: Some(Key::data("items")),
                ..Default::default()
            },
        });
        let out = transform
            .transform(Message::new().with_data(r#"{"id":7,"items":[{"x":1},{"x":2}]}"#))
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[1].get_value("id").as_i64(), 7);
        assert_eq!(out[1].get_value("x").as_i64(), 2);
        assert!(!out[1].get_value("items").exists());
    }

    #[tokio::test]
    async fn from_string_splits_on_separator() {
        let transform = AggregateFromString::new(AggregateFromStringSettings::default());
        let out = transform
            .transform(Message::new().with_data("a\nb\n\nc\n"))
            .await
            .unwrap();
        let pieces: Vec<_> = out.iter().map(|m| m.to_string()).collect();
        assert_eq!(pieces, vec!["a", "b", "c"]);
    }
}
