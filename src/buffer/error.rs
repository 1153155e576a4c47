use thiserror::Error;

/// Errors raised by aggregation buffers and batched writes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Item of {size} bytes exceeds the buffer limit of {max} bytes")]
    ItemTooLarge { size: usize, max: usize },

    #[error("Batch write still rejected {remaining} items after {attempts} attempts")]
    RetriesExhausted { attempts: u32, remaining: usize },

    #[error("Batch writer rejected index {index} of a {len}-item batch")]
    InvalidReport { index: usize, len: usize },

    #[error("Batch write failed: {0}")]
    Write(String),

    #[error("Batch write cancelled")]
    Cancelled,
}
