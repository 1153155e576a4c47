use std::io;
use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::io::IoError;
use crate::streaming::PipelineError;
use crate::transform::TransformError;

/// Top-level application errors unifying all layer errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Source or sink error: {0}")]
    Stream(#[from] IoError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("{0} self-test(s) failed")]
    TestsFailed(usize),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}
