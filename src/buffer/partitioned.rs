use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::debug;

use super::batch::{Buffer, BufferConfig, ByteSize, Rejected};
use super::error::BufferError;

/// Items flushed from one partition key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    pub key: String,
    pub items: Vec<T>,
}

/// Independent buffers keyed by partition
///
/// Buffers are created lazily on the first push for a key. Overflow on one
/// key flushes only that key; the empty key is the shared fallback buffer.
#[derive(Debug)]
pub struct PartitionedBuffer<T> {
    config: BufferConfig,
    order: Vec<String>,
    buffers: HashMap<String, Buffer<T>>,
}

impl<T: ByteSize> PartitionedBuffer<T> {
    pub fn new(config: BufferConfig) -> Self {
        Self {
            config,
            order: Vec::new(),
            buffers: HashMap::new(),
        }
    }

    /// Add an item under a key
    ///
    /// Returns the key's previous contents when they had to be flushed to
    /// make room. An item that exceeds the size bound on its own is fatal.
    pub fn push(&mut self, key: &str, item: T) -> Result<Option<Batch<T>>, BufferError> {
        let buffer = match self.buffers.entry(key.to_string()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                self.order.push(key.to_string());
                e.insert(Buffer::new(&self.config))
            }
        };

        let item = match buffer.try_add(item) {
            Ok(()) => return Ok(None),
            Err(Rejected::TooLarge(item)) => {
                return Err(BufferError::ItemTooLarge {
                    size: item.byte_size(),
                    max: buffer.max_size(),
                });
            }
            Err(Rejected::Full(item)) => item,
        };

        let items = buffer.take();
        debug!(key, count = items.len(), "Buffer full, flushing partition");

        // An empty buffer only refuses an item that is too large on its own.
        if let Err(rejected) = buffer.try_add(item) {
            let item = rejected.into_inner();
            return Err(BufferError::ItemTooLarge {
                size: item.byte_size(),
                max: buffer.max_size(),
            });
        }

        Ok(Some(Batch {
            key: key.to_string(),
            items,
        }))
    }

    /// Flush every non-empty buffer, in the order keys were first seen
    pub fn drain(&mut self) -> Vec<Batch<T>> {
        let mut batches = Vec::new();
        for key in &self.order {
            if let Some(buffer) = self.buffers.get_mut(key)
                && !buffer.is_empty()
            {
                batches.push(Batch {
                    key: key.clone(),
                    items: buffer.take(),
                });
            }
        }
        batches
    }

    pub fn count(&self, key: &str) -> usize {
        self.buffers.get(key).map_or(0, Buffer::count)
    }

    pub fn total_count(&self) -> usize {
        self.buffers.values().map(Buffer::count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.values().all(Buffer::is_empty)
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }
}
