use async_trait::async_trait;
use serde::Deserialize;

use super::error::TransformError;
use super::transformer::Transformer;
use crate::config::ObjectSettings;
use crate::message::{Key, Message};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StringCaseSettings {
    #[serde(default)]
    pub object: ObjectSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StringAppendSettings {
    #[serde(default)]
    pub object: ObjectSettings,
    #[serde(default)]
    pub suffix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOp {
    Lower,
    Upper,
}

/// Applies a string function to the payload or to a field
///
/// A field result is written to the target key, or back to the source when
/// no target is set. Missing fields pass through unchanged.
fn map_string<F>(
    mut message: Message,
    source: Option<&Key>,
    target: Option<&Key>,
    f: F,
) -> Result<Vec<Message>, TransformError>
where
    F: Fn(&str) -> String,
{
    if message.is_control() {
        return Ok(vec![message]);
    }

    match source {
        None => {
            let result = f(&String::from_utf8_lossy(message.data()));
            message.set_data(result);
        }
        Some(source) => {
            let value = message.get(source);
            if !value.exists() {
                return Ok(vec![message]);
            }
            let result = f(&value.as_string());
            message.set(target.unwrap_or(source), result)?;
        }
    }
    Ok(vec![message])
}

/// Converts case
pub struct StringCase {
    op: StringOp,
    object: ObjectSettings,
}

impl StringCase {
    pub fn new(op: StringOp, settings: StringCaseSettings) -> Self {
        Self {
            op,
            object: settings.object,
        }
    }
}

#[async_trait]
impl Transformer for StringCase {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        map_string(message, self.object.source(), self.object.target(), |s| match self.op {
            StringOp::Lower => s.to_lowercase(),
            StringOp::Upper => s.to_uppercase(),
        })
    }
}

/// Appends a literal suffix
pub struct StringAppend {
    object: ObjectSettings,
    suffix: String,
}

impl StringAppend {
    pub fn new(settings: StringAppendSettings) -> Self {
        Self {
            object: settings.object,
            suffix: settings.suffix,
        }
    }
}

#[async_trait]
impl Transformer for StringAppend {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        map_string(message, self.object.source(), self.object.target(), |s| {
            format!("{s}{}", self.suffix)
        })
    }
}
