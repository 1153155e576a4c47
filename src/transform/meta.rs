use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::error::TransformError;
use super::transformer::{Transformer, apply};
use crate::condition::Condition;
use crate::config::{ConditionConfig, TransformConfig};
use crate::message::Message;

#[derive(Debug, Clone, Deserialize)]
pub struct MetaSwitchCaseSettings {
    /// An absent condition always matches
    #[serde(default)]
    pub condition: Option<ConditionConfig>,
    pub transforms: Vec<TransformConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaSwitchSettings {
    pub cases: Vec<MetaSwitchCaseSettings>,
}

pub struct SwitchCase {
    pub condition: Option<Condition>,
    pub transforms: Vec<Arc<dyn Transformer>>,
}

/// Runs the transforms of the first case whose condition matches
///
/// Unmatched messages pass through. A control message is sent through every
/// case so each can flush, and is forwarded once at the end.
pub struct MetaSwitch {
    cases: Vec<SwitchCase>,
}

impl MetaSwitch {
    pub fn new(cases: Vec<SwitchCase>) -> Self {
        Self { cases }
    }
}

#[async_trait]
impl Transformer for MetaSwitch {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        if message.is_control() {
            let mut output = Vec::new();
            for case in &self.cases {
                let flushed = apply(&case.transforms, vec![message.clone()]).await?;
                output.extend(flushed.into_iter().filter(|m| !m.is_control()));
            }
            output.push(message);
            return Ok(output);
        }

        for case in &self.cases {
            let matched = match &case.condition {
                Some(condition) => condition.evaluate(&message).await?,
                None => true,
            };
            if matched {
                return apply(&case.transforms, vec![message]).await;
            }
        }
        Ok(vec![message])
    }

    async fn close(&self) -> Result<(), TransformError> {
        for case in &self.cases {
            for transform in &case.transforms {
                transform.close().await?;
            }
        }
        Ok(())
    }
}
