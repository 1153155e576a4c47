use std::io;
use thiserror::Error;

/// Configuration errors, raised before any message flows
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unknown transform type: {0}")]
    UnknownTransform(String),

    #[error("Unknown inspector type: {0}")]
    UnknownInspector(String),

    #[error("Unknown KV store type: {0}")]
    UnknownStore(String),

    #[error("KV store not configured: {0}")]
    MissingStore(String),

    #[error("Invalid settings for {kind}: {reason}")]
    InvalidSettings { kind: String, reason: String },

    #[error("No transforms configured")]
    NoTransforms,

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },
}

impl ConfigError {
    pub fn invalid(kind: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidSettings {
            kind: kind.to_string(),
            reason: reason.to_string(),
        }
    }
}
