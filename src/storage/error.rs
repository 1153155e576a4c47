use thiserror::Error;

/// Storage-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Store not found: {0}")]
    NotFound(String),

    #[error("Operation not supported by store: {0}")]
    Unsupported(&'static str),

    #[error("Storage backend error: {0}")]
    Backend(String),
}
