use std::sync::Arc;

use tracing::{error, warn};

use super::error::TransformError;
use crate::config::ErrorMode;

/// Policy for handling per-message transform errors
pub trait ErrorPolicy: Send + Sync {
    /// Handle a transform error
    /// Return true to forward the input unmodified, false to abort
    fn handle_transform_error(&self, transform: &str, error: &TransformError) -> bool;

    /// Whether this policy can ever continue past an error
    fn continues(&self) -> bool;
}

/// Skip errors and continue processing (log a warning)
pub struct SkipErrors;

impl ErrorPolicy for SkipErrors {
    fn handle_transform_error(&self, transform: &str, error: &TransformError) -> bool {
        warn!(transform, error = %error, "Transform error (skipping)");
        true
    }

    fn continues(&self) -> bool {
        true
    }
}

/// Abort on first error
pub struct AbortOnError;

impl ErrorPolicy for AbortOnError {
    fn handle_transform_error(&self, transform: &str, error: &TransformError) -> bool {
        error!(transform, error = %error, "Transform error (aborting)");
        false
    }

    fn continues(&self) -> bool {
        false
    }
}

/// Silent error policy - skip errors without logging
pub struct SilentSkip;

impl ErrorPolicy for SilentSkip {
    fn handle_transform_error(&self, _transform: &str, _error: &TransformError) -> bool {
        true
    }

    fn continues(&self) -> bool {
        true
    }
}

impl ErrorMode {
    /// The policy a configured mode selects
    pub fn policy(self) -> Arc<dyn ErrorPolicy> {
        match self {
            Self::Abort => Arc::new(AbortOnError),
            Self::Skip => Arc::new(SkipErrors),
            Self::Silent => Arc::new(SilentSkip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error() -> TransformError {
        TransformError::failed("test", "boom")
    }

    #[test]
    fn skip_errors_continues() {
        assert!(SkipErrors.handle_transform_error("test", &error()));
        assert!(SkipErrors.continues());
    }

    #[test]
    fn abort_on_error_stops() {
        assert!(!AbortOnError.handle_transform_error("test", &error()));
        assert!(!AbortOnError.continues());
    }

    #[test]
    fn silent_skip_continues() {
        assert!(SilentSkip.handle_transform_error("test", &error()));
    }

    #[test]
    fn modes_select_policies() {
        assert!(!ErrorMode::Abort.policy().continues());
        assert!(ErrorMode::Skip.policy().continues());
        assert!(ErrorMode::Silent.policy().continues());
    }
}
