use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::ConditionError;
use crate::message::Message;

/// A boolean predicate over one message
#[async_trait]
pub trait Inspector: Send + Sync {
    async fn inspect(&self, message: &Message) -> Result<bool, ConditionError>;
}

/// How inspector results combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Every inspector passes
    #[default]
    All,
    /// At least one inspector passes
    Any,
    /// No inspector passes
    None,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::Any => "any",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// An operator applied to a list of inspectors
///
/// Evaluation short-circuits. Control messages never satisfy a condition.
pub struct Condition {
    operator: Operator,
    inspectors: Vec<Box<dyn Inspector>>,
}

impl Condition {
    pub fn new(operator: Operator, inspectors: Vec<Box<dyn Inspector>>) -> Self {
        Self {
            operator,
            inspectors,
        }
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn len(&self) -> usize {
        self.inspectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inspectors.is_empty()
    }

    pub async fn evaluate(&self, message: &Message) -> Result<bool, ConditionError> {
        if message.is_control() {
            return Ok(false);
        }
        if self.inspectors.is_empty() {
            return Err(ConditionError::NoInspectors);
        }

        match self.operator {
            Operator::All => {
                for inspector in &self.inspectors {
                    if !inspector.inspect(message).await? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Operator::Any => {
                for inspector in &self.inspectors {
                    if inspector.inspect(message).await? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Operator::None => {
                for inspector in &self.inspectors {
                    if inspector.inspect(message).await? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl Inspector for Condition {
    async fn inspect(&self, message: &Message) -> Result<bool, ConditionError> {
        self.evaluate(message).await
    }
}

impl std::fmt::Debug for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Condition")
            .field("operator", &self.operator)
            .field("inspectors", &self.inspectors.len())
            .finish()
    }
}
