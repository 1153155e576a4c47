use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::IoError;
use crate::buffer::{Batch, BatchWriter, BufferConfig, PartitionedBuffer, RetryPolicy, write_with_retry};
use crate::message::{Key, Message};

/// Terminal stage of a pipeline
///
/// The sink task calls `deliver` for every data message, `flush` when the
/// control message arrives, and `close` once its input is exhausted.
#[async_trait]
pub trait Sink: Send {
    async fn deliver(&mut self, message: Message) -> Result<(), IoError>;

    async fn flush(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), IoError> {
        self.flush().await
    }
}

/// Writes message data newline-delimited to any async writer
pub struct WriterSink<W: AsyncWrite> {
    writer: BufWriter<W>,
    written: usize,
}

impl<W: AsyncWrite + Unpin + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    /// Number of messages written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Sink for WriterSink<W> {
    async fn deliver(&mut self, message: Message) -> Result<(), IoError> {
        self.writer.write_all(message.data()).await?;
        self.writer.write_all(b"\n").await?;
        self.written += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), IoError> {
        self.writer.flush().await?;
        Ok(())
    }
}

/// Keeps every delivered message in memory
///
/// Clones share the same storage, so a handle kept by the caller observes
/// what the pipeline delivered.
#[derive(Debug, Clone, Default)]
pub struct CollectSink {
    messages: Arc<Mutex<Vec<Message>>>,
    flushes: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the delivered data messages
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of control messages that reached the sink
    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for CollectSink {
    async fn deliver(&mut self, message: Message) -> Result<(), IoError> {
        if self.is_closed() {
            return Err(IoError::Closed("collect".to_string()));
        }
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), IoError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), IoError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Batches message data per partition key and writes it through a [`BatchWriter`]
///
/// Full partitions are written as they fill; every partition is written on
/// flush. Rejected subsets are retried under the configured [`RetryPolicy`].
///
/// # Example
/// ```rust,ignore
/// let sink = BatchSink::new(client, BufferConfig::new(500, 0))
///     .with_batch_key(Key::data("tenant"))
///     .with_retry(RetryPolicy::default());
/// ```
pub struct BatchSink<W> {
    writer: W,
    buffer: PartitionedBuffer<Vec<u8>>,
    batch_key: Option<Key>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<W: BatchWriter> BatchSink<W> {
    pub fn new(writer: W, config: BufferConfig) -> Self {
        Self {
            writer,
            buffer: PartitionedBuffer::new(config),
            batch_key: None,
            policy: RetryPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Partition batches by the value found at `key`
    pub fn with_batch_key(mut self, key: Key) -> Self {
        self.batch_key = Some(key);
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Abort retry backoff when `cancel` fires
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    async fn write(&self, batch: Batch<Vec<u8>>) -> Result<(), IoError> {
        let count = batch.items.len();
        let attempts =
            write_with_retry(&self.writer, &batch.key, batch.items, &self.policy, &self.cancel).await?;
        debug!(key = %batch.key, count, attempts, "Batch delivered");
        Ok(())
    }
}

#[async_trait]
impl<W: BatchWriter> Sink for BatchSink<W> {
    async fn deliver(&mut self, message: Message) -> Result<(), IoError> {
        let key = self
            .batch_key
            .as_ref()
            .map(|k| message.get(k).as_string())
            .unwrap_or_default();
        if let Some(batch) = self.buffer.push(&key, message.into_data())? {
            self.write(batch).await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), IoError> {
        for batch in self.buffer.drain() {
            self.write(batch).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BatchReport, BufferError};
    use std::time::Duration;

    #[tokio::test]
    async fn writer_sink_writes_lines() {
        let mut sink = WriterSink::new(Vec::new());
        sink.deliver(Message::new().with_data("a")).await.unwrap();
        sink.deliver(Message::new().with_data("b")).await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(sink.written(), 2);
        assert_eq!(sink.into_inner(), b"a\nb\n");
    }

    #[tokio::test]
    async fn collect_sink_shares_state_across_clones() {
        let handle = CollectSink::new();
        let mut sink = handle.clone();
        sink.deliver(Message::new().with_data("x")).await.unwrap();
        sink.flush().await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(handle.messages().len(), 1);
        assert_eq!(handle.flushes(), 1);
        assert!(handle.is_closed());
        assert!(sink.deliver(Message::new()).await.is_err());
    }

    /// Rejects the first item of every first submission per key
    #[derive(Default)]
    struct Flaky {
        seen: Mutex<Vec<(String, Vec<Vec<u8>>)>>,
    }

    #[async_trait]
    impl BatchWriter for Flaky {
        async fn write_batch(&self, key: &str, items: &[Vec<u8>]) -> Result<BatchReport, BufferError> {
            let mut seen = self.seen.lock().unwrap();
            let first = !seen.iter().any(|(k, _)| k == key);
            seen.push((key.to_string(), items.to_vec()));
            Ok(if first { BatchReport::rejected([0]) } else { BatchReport::accepted() })
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn batch_sink_partitions_and_retries_rejected() {
        let mut sink = BatchSink::new(Flaky::default(), BufferConfig::new(2, 0))
            .with_batch_key(Key::data("k"))
            .with_retry(fast());

        for data in [r#"{"k":"a","n":1}"#, r#"{"k":"b","n":2}"#, r#"{"k":"a","n":3}"#] {
            sink.deliver(Message::new().with_data(data)).await.unwrap();
        }
        assert!(sink.writer().seen.lock().unwrap().is_empty());

        sink.flush().await.unwrap();
        let seen = sink.writer().seen.lock().unwrap().clone();
        let keys: Vec<_> = seen.iter().map(|(k, items)| (k.as_str(), items.len())).collect();
        assert_eq!(keys, vec![("a", 2), ("a", 1), ("b", 1), ("b", 1)]);
    }

    #[tokio::test]
    async fn batch_sink_writes_full_partition_immediately() {
        let mut sink = BatchSink::new(Flaky::default(), BufferConfig::new(1, 0)).with_retry(fast());
        sink.deliver(Message::new().with_data("1")).await.unwrap();
        sink.deliver(Message::new().with_data("2")).await.unwrap();

        let seen = sink.writer().seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1, vec![b"1".to_vec()]);
    }
}
