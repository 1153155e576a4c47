use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as Json;

use super::error::ConditionError;
use super::operator::{Condition, Inspector};
use crate::config::{ConditionConfig, InspectorConfig, ObjectSettings};
use crate::message::{Key, Message};

/// Settings shared by the string inspectors
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StringSettings {
    #[serde(default)]
    pub object: ObjectSettings,
    #[serde(default, alias = "string")]
    pub value: String,
}

/// Settings shared by the number inspectors
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NumberSettings {
    #[serde(default)]
    pub object: ObjectSettings,
    #[serde(default)]
    pub value: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatSettings {
    #[serde(default)]
    pub object: ObjectSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NegateSettings {
    pub inspector: InspectorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NestedSettings {
    pub condition: ConditionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOp {
    EqualTo,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
}

/// Compares a string field (or the whole payload) against a literal or
/// another field
#[derive(Debug, Clone)]
pub struct StringCompare {
    op: StringOp,
    source: Option<Key>,
    target: Option<Key>,
    value: String,
}

impl StringCompare {
    pub fn new(op: StringOp, settings: StringSettings) -> Self {
        Self {
            op,
            source: settings.object.source().cloned(),
            target: settings.object.target().cloned(),
            value: settings.value,
        }
    }
}

#[async_trait]
impl Inspector for StringCompare {
    async fn inspect(&self, message: &Message) -> Result<bool, ConditionError> {
        if message.is_control() {
            return Ok(false);
        }

        let check = match &self.source {
            Some(key) => message.get(key).as_string(),
            None => String::from_utf8_lossy(message.data()).into_owned(),
        };
        let against = match &self.target {
            Some(key) => message.get(key).as_string(),
            None => self.value.clone(),
        };

        Ok(match self.op {
            StringOp::EqualTo => check == against,
            StringOp::Contains => check.contains(&against),
            StringOp::StartsWith => check.starts_with(&against),
            StringOp::EndsWith => check.ends_with(&against),
            StringOp::GreaterThan => check > against,
            StringOp::LessThan => check < against,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberOp {
    EqualTo,
    GreaterThan,
    LessThan,
}

/// Compares a numeric field (or the payload parsed as a number)
#[derive(Debug, Clone)]
pub struct NumberCompare {
    op: NumberOp,
    source: Option<Key>,
    target: Option<Key>,
    value: f64,
}

impl NumberCompare {
    pub fn new(op: NumberOp, settings: NumberSettings) -> Self {
        Self {
            op,
            source: settings.object.source().cloned(),
            target: settings.object.target().cloned(),
            value: settings.value,
        }
    }

    fn read(message: &Message, key: Option<&Key>) -> Option<f64> {
        match key {
            Some(key) => {
                let value = message.get(key);
                value.exists().then(|| value.as_f64())
            }
            None => String::from_utf8_lossy(message.data()).trim().parse().ok(),
        }
    }
}

#[async_trait]
impl Inspector for NumberCompare {
    async fn inspect(&self, message: &Message) -> Result<bool, ConditionError> {
        if message.is_control() {
            return Ok(false);
        }

        let Some(check) = Self::read(message, self.source.as_ref()) else {
            return Ok(false);
        };
        let against = match &self.target {
            Some(key) => match Self::read(message, Some(key)) {
                Some(n) => n,
                None => return Ok(false),
            },
            None => self.value,
        };

        Ok(match self.op {
            NumberOp::EqualTo => check == against,
            NumberOp::GreaterThan => check > against,
            NumberOp::LessThan => check < against,
        })
    }
}

/// Passes when the payload (or a field) is valid JSON text
#[derive(Debug, Clone)]
pub struct FormatJson {
    source: Option<Key>,
}

impl FormatJson {
    pub fn new(settings: FormatSettings) -> Self {
        Self {
            source: settings.object.source().cloned(),
        }
    }
}

#[async_trait]
impl Inspector for FormatJson {
    async fn inspect(&self, message: &Message) -> Result<bool, ConditionError> {
        if message.is_control() {
            return Ok(false);
        }

        let bytes = match &self.source {
            Some(key) => message.get(key).to_bytes(),
            None => message.data().to_vec(),
        };
        Ok(serde_json::from_slice::<Json>(&bytes).is_ok())
    }
}

/// Inverts a nested inspector
pub struct MetaNegate {
    inner: Box<dyn Inspector>,
}

impl MetaNegate {
    pub fn new(inner: Box<dyn Inspector>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Inspector for MetaNegate {
    async fn inspect(&self, message: &Message) -> Result<bool, ConditionError> {
        if message.is_control() {
            return Ok(false);
        }
        Ok(!self.inner.inspect(message).await?)
    }
}

/// Evaluates a nested condition as one inspector
pub struct MetaCondition {
    condition: Condition,
}

impl MetaCondition {
    pub fn new(condition: Condition) -> Self {
        Self { condition }
    }
}

#[async_trait]
impl Inspector for MetaCondition {
    async fn inspect(&self, message: &Message) -> Result<bool, ConditionError> {
        self.condition.evaluate(message).await
    }
}
