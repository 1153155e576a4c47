use thiserror::Error;

use crate::io::IoError;
use crate::transform::TransformError;

/// Errors surfaced by the executor and orchestrator
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Pipeline cancelled")]
    Cancelled,

    #[error("Stage {stage} panicked: {reason}")]
    Panicked { stage: String, reason: String },

    #[error("Sink stopped before signalling completion")]
    Incomplete,
}

impl PipelineError {
    pub(crate) fn panicked(stage: impl Into<String>, error: tokio::task::JoinError) -> Self {
        if error.is_cancelled() {
            return Self::Cancelled;
        }
        Self::Panicked {
            stage: stage.into(),
            reason: error.to_string(),
        }
    }
}
