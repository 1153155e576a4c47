use serde::{Deserialize, Serialize};

/// Which part of a message a key addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Data,
    Metadata,
}

/// A configured path bound to a message field
///
/// Deserializes from a plain string (data) or `{"metadata": "path"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Data(String),
    Metadata { metadata: String },
}

impl Key {
    pub fn data(path: impl Into<String>) -> Self {
        Self::Data(path.into())
    }

    pub fn metadata(path: impl Into<String>) -> Self {
        Self::Metadata {
            metadata: path.into(),
        }
    }

    pub fn field(&self) -> Field {
        match self {
            Self::Data(_) => Field::Data,
            Self::Metadata { .. } => Field::Metadata,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Data(path) => path,
            Self::Metadata { metadata } => metadata,
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data(path) => write!(f, "{path}"),
            Self::Metadata { metadata } => write!(f, "metadata:{metadata}"),
        }
    }
}
