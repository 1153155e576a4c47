use thiserror::Error;

/// Errors raised while reading or mutating structured message content
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Content is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Cannot set {path}: {reason}")]
    IncompatibleValue { path: String, reason: String },
}
