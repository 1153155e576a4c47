use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::error::TransformError;
use super::transformer::{Transformer, lock};
use crate::buffer::{Batch, BufferConfig, PartitionedBuffer};
use crate::config::ObjectSettings;
use crate::message::{Key, Message};

type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendStdoutSettings {
    #[serde(default)]
    pub object: ObjectSettings,
    #[serde(default)]
    pub batch: BufferConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendFileSettings {
    pub file_path: PathBuf,
    #[serde(default)]
    pub object: ObjectSettings,
    #[serde(default)]
    pub batch: BufferConfig,
}

/// Where batches are written
pub enum Destination {
    Stdout,
    /// Appended to, created on first write
    File(PathBuf),
    Writer(tokio::sync::Mutex<BoxWriter>),
}

impl Destination {
    pub fn writer(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self::Writer(tokio::sync::Mutex::new(Box::new(writer)))
    }

    async fn write_lines(&self, items: &[Vec<u8>]) -> std::io::Result<()> {
        let mut payload = Vec::with_capacity(items.iter().map(|i| i.len() + 1).sum());
        for item in items {
            payload.extend_from_slice(item);
            payload.push(b'\n');
        }

        match self {
            Self::Stdout => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(&payload).await?;
                stdout.flush().await
            }
            Self::File(path) => {
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await?;
                file.write_all(&payload).await?;
                file.flush().await
            }
            Self::Writer(writer) => {
                let mut writer = writer.lock().await;
                writer.write_all(&payload).await?;
                writer.flush().await
            }
        }
    }
}

/// Batches payloads and writes them newline-delimited to a destination
///
/// Messages pass through unchanged. Batches are written when a partition
/// fills and when a control message arrives.
pub struct SendBatch {
    name: &'static str,
    batch_key: Option<Key>,
    buffer: Mutex<PartitionedBuffer<Vec<u8>>>,
    destination: Destination,
}

impl SendBatch {
    pub fn new(
        name: &'static str,
        object: &ObjectSettings,
        batch: BufferConfig,
        destination: Destination,
    ) -> Self {
        Self {
            name,
            batch_key: object.batch().cloned(),
            buffer: Mutex::new(PartitionedBuffer::new(batch)),
            destination,
        }
    }

    pub fn stdout(settings: SendStdoutSettings) -> Self {
        Self::new("send_stdout", &settings.object, settings.batch, Destination::Stdout)
    }

    pub fn file(settings: SendFileSettings) -> Self {
        Self::new(
            "send_file",
            &settings.object,
            settings.batch,
            Destination::File(settings.file_path),
        )
    }

    async fn send(&self, batch: Batch<Vec<u8>>) -> Result<(), TransformError> {
        debug!(transform = self.name, key = %batch.key, count = batch.items.len(), "Sending batch");
        self.destination.write_lines(&batch.items).await?;
        Ok(())
    }
}

#[async_trait]
impl Transformer for SendBatch {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        if message.is_control() {
            let batches = lock(&self.buffer).drain();
            for batch in batches {
                self.send(batch).await?;
            }
            return Ok(vec![message]);
        }

        let key = self
            .batch_key
            .as_ref()
            .map(|k| message.get(k).as_string())
            .unwrap_or_default();
        let full = lock(&self.buffer).push(&key, message.data().to_vec())?;
        if let Some(batch) = full {
            self.send(batch).await?;
        }
        Ok(vec![message])
    }
}
