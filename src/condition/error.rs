use thiserror::Error;

use crate::message::MessageError;

/// Errors raised while evaluating a condition
#[derive(Error, Debug)]
pub enum ConditionError {
    #[error("Condition operator has no inspectors")]
    NoInspectors,

    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    #[error("Inspection failed: {0}")]
    Inspect(String),
}
