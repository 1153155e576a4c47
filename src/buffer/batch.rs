use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::message::Message;

const DEFAULT_COUNT: usize = 1000;
const DEFAULT_SIZE: usize = 1024 * 1024;

/// Anything whose contribution to a buffer's byte size can be measured
pub trait ByteSize {
    fn byte_size(&self) -> usize;
}

impl ByteSize for Vec<u8> {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl ByteSize for String {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl ByteSize for Message {
    fn byte_size(&self) -> usize {
        self.data().len()
    }
}

/// Limits for a single buffer
///
/// Zero count or size means "use the default" (1000 items, 1 MiB). The
/// optional duration forces a flush once a non-empty buffer has gone that
/// long without accepting an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub size: usize,
    #[serde(
        default,
        deserialize_with = "crate::config::deserialize_duration",
        skip_serializing
    )]
    pub duration: Option<Duration>,
}

impl BufferConfig {
    pub fn new(count: usize, size: usize) -> Self {
        Self {
            count,
            size,
            duration: None,
        }
    }

    pub fn max_count(&self) -> usize {
        if self.count == 0 { DEFAULT_COUNT } else { self.count }
    }

    pub fn max_size(&self) -> usize {
        if self.size == 0 { DEFAULT_SIZE } else { self.size }
    }
}

/// Why an item was not added
#[derive(Debug, PartialEq, Eq)]
pub enum Rejected<T> {
    /// Adding would exceed a bound; flush and retry
    Full(T),
    /// The item alone exceeds the size bound and can never be added
    TooLarge(T),
}

impl<T> Rejected<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::TooLarge(item) => item,
        }
    }
}

/// A bounded, ordered accumulator
///
/// Count and byte size never exceed the configured bounds: an add that would
/// cross either one is refused and leaves the buffer untouched.
#[derive(Debug)]
pub struct Buffer<T> {
    max_count: usize,
    max_size: usize,
    max_idle: Option<Duration>,
    last_add: Instant,
    size: usize,
    items: Vec<T>,
}

impl<T: ByteSize> Buffer<T> {
    pub fn new(config: &BufferConfig) -> Self {
        Self {
            max_count: config.max_count(),
            max_size: config.max_size(),
            max_idle: config.duration,
            last_add: Instant::now(),
            size: 0,
            items: Vec::new(),
        }
    }

    pub fn try_add(&mut self, item: T) -> Result<(), Rejected<T>> {
        let item_size = item.byte_size();
        if item_size > self.max_size {
            return Err(Rejected::TooLarge(item));
        }

        if self.items.len() + 1 > self.max_count || self.size + item_size > self.max_size {
            return Err(Rejected::Full(item));
        }

        if let Some(idle) = self.max_idle
            && !self.items.is_empty()
            && self.last_add.elapsed() > idle
        {
            return Err(Rejected::Full(item));
        }

        self.last_add = Instant::now();
        self.size += item_size;
        self.items.push(item);
        Ok(())
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.size = 0;
        self.last_add = Instant::now();
    }

    /// Remove and return every item, leaving the buffer empty
    pub fn take(&mut self) -> Vec<T> {
        let items = std::mem::take(&mut self.items);
        self.reset();
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(len: usize) -> Vec<u8> {
        vec![b'x'; len]
    }

    #[test]
    fn defaults_apply_to_zero_limits() {
        let config = BufferConfig::default();
        assert_eq!(config.max_count(), 1000);
        assert_eq!(config.max_size(), 1024 * 1024);
    }

    #[test]
    fn refuses_add_past_count_without_mutation() {
        let mut buffer = Buffer::new(&BufferConfig::new(2, 0));
        buffer.try_add(item(1)).unwrap();
        buffer.try_add(item(1)).unwrap();

        let rejected = buffer.try_add(item(1)).unwrap_err();
        assert!(matches!(rejected, Rejected::Full(_)));
        assert_eq!(buffer.count(), 2);
        assert_eq!(buffer.size(), 2);
    }

    #[test]
    fn refuses_add_past_size_without_mutation() {
        let mut buffer = Buffer::new(&BufferConfig::new(0, 10));
        buffer.try_add(item(6)).unwrap();

        assert!(matches!(buffer.try_add(item(5)), Err(Rejected::Full(_))));
        assert_eq!(buffer.size(), 6);
        buffer.try_add(item(4)).unwrap();
        assert_eq!(buffer.size(), 10);
    }

    #[test]
    fn oversized_item_is_too_large_even_when_empty() {
        let mut buffer = Buffer::new(&BufferConfig::new(0, 4));
        let rejected = buffer.try_add(item(5)).unwrap_err();
        assert_eq!(rejected, Rejected::TooLarge(item(5)));
        assert!(buffer.is_empty());
    }

    #[test]
    fn take_returns_items_in_order_and_resets() {
        let mut buffer = Buffer::new(&BufferConfig::default());
        buffer.try_add(b"a".to_vec()).unwrap();
        buffer.try_add(b"b".to_vec()).unwrap();

        assert_eq!(buffer.take(), vec![b"a".to_vec(), b"b".to_vec()]);
        assert!(buffer.is_empty());
        assert_eq!(buffer.size(), 0);
    }

    #[test]
    fn idle_buffer_asks_for_flush() {
        let config = BufferConfig {
            duration: Some(Duration::from_millis(1)),
            ..BufferConfig::default()
        };
        let mut buffer = Buffer::new(&config);
        buffer.try_add(item(1)).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        assert!(matches!(buffer.try_add(item(1)), Err(Rejected::Full(_))));

        buffer.reset();
        buffer.try_add(item(1)).unwrap();
    }

    #[test]
    fn message_size_counts_data_only() {
        let msg = Message::new().with_data("abc").with_metadata("ignored");
        assert_eq!(msg.byte_size(), 3);
    }
}
