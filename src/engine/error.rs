use thiserror::Error;

use crate::config::ConfigError;
use crate::condition::ConditionError;
use crate::streaming::PipelineError;
use crate::transform::TransformError;

/// Engine-level errors for building and running a configuration
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}
