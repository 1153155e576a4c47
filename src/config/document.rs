use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::error::ConfigError;
use crate::condition::Operator;

/// A complete pipeline configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Worker pool size per stage; overrides `SUBSTATION_CONCURRENCY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Capacity of each stage channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_capacity: Option<usize>,

    /// Named key-value stores shared by enrichment transforms
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub kv_stores: BTreeMap<String, StoreConfig>,

    #[serde(default)]
    pub transforms: Vec<TransformConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestConfig>,
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One configured transform: `{type, settings}` plus gate and error policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Json::is_null")]
    pub settings: Json,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionConfig>,

    #[serde(default, skip_serializing_if = "ErrorMode::is_abort")]
    pub error_policy: ErrorMode,
}

impl TransformConfig {
    pub fn new(kind: impl Into<String>, settings: Json) -> Self {
        Self {
            kind: kind.into(),
            settings,
            condition: None,
            error_policy: ErrorMode::Abort,
        }
    }

    pub fn with_condition(mut self, condition: ConditionConfig) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_error_policy(mut self, mode: ErrorMode) -> Self {
        self.error_policy = mode;
        self
    }
}

/// How a transform's per-message errors are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Propagate and stop the pipeline
    #[default]
    Abort,
    /// Log a warning and forward the input unmodified
    Skip,
    /// Forward the input unmodified without logging
    Silent,
}

impl ErrorMode {
    fn is_abort(&self) -> bool {
        *self == Self::Abort
    }
}

/// A condition: an operator over a list of inspectors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    #[serde(default)]
    pub operator: Operator,

    #[serde(default)]
    pub inspectors: Vec<InspectorConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectorConfig {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Json::is_null")]
    pub settings: Json,
}

impl InspectorConfig {
    pub fn new(kind: impl Into<String>, settings: Json) -> Self {
        Self {
            kind: kind.into(),
            settings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Json::is_null")]
    pub settings: Json,
}

/// A configuration self-test
///
/// The generator transforms receive a single control message; everything
/// they emit runs through the configuration and every output must satisfy
/// the condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    #[serde(default)]
    pub name: String,

    pub transforms: Vec<TransformConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionConfig>,
}

/// Decode a settings object into a typed struct; null decodes as `{}`
pub fn decode_settings<T: DeserializeOwned>(kind: &str, settings: &Json) -> Result<T, ConfigError> {
    let value = if settings.is_null() {
        Json::Object(Default::default())
    } else {
        settings.clone()
    };
    serde_json::from_value(value).map_err(|e| ConfigError::invalid(kind, e))
}
