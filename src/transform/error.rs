use std::io;
use thiserror::Error;

use crate::buffer::BufferError;
use crate::condition::ConditionError;
use crate::message::MessageError;
use crate::storage::StorageError;

/// Per-message transform errors
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Transform {transform} failed: {reason}")]
    Failed { transform: String, reason: String },

    #[error("Transform cancelled")]
    Cancelled,
}

impl TransformError {
    pub fn failed(transform: &str, reason: impl std::fmt::Display) -> Self {
        Self::Failed {
            transform: transform.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Errors no error policy may skip
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Buffer(_) | Self::Cancelled)
    }
}
