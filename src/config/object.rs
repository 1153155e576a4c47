use serde::{Deserialize, Serialize};

use crate::message::Key;

/// The `object` settings block shared by transforms and inspectors
///
/// An absent (or empty) source key addresses the whole data payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_key: Option<Key>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_key: Option<Key>,

    /// Partition key for aggregating transforms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_key: Option<Key>,
}

impl ObjectSettings {
    pub fn source(&self) -> Option<&Key> {
        non_empty(&self.source_key)
    }

    pub fn target(&self) -> Option<&Key> {
        non_empty(&self.target_key)
    }

    pub fn batch(&self) -> Option<&Key> {
        non_empty(&self.batch_key)
    }
}

fn non_empty(key: &Option<Key>) -> Option<&Key> {
    key.as_ref().filter(|k| !k.path().is_empty())
}
