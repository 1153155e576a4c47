use std::num::NonZeroUsize;

use super::error::ConfigError;

pub const CONCURRENCY_VAR: &str = "SUBSTATION_CONCURRENCY";
pub const DEBUG_VAR: &str = "SUBSTATION_DEBUG";

/// Process-wide controls, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Worker pool size per stage
    pub concurrency: usize,
    /// Enables debug-level logging
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency: available_cpus(),
            debug: false,
        }
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(value) = lookup(CONCURRENCY_VAR) {
            settings.concurrency = value
                .trim()
                .parse::<NonZeroUsize>()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: CONCURRENCY_VAR.to_string(),
                    value: value.clone(),
                })?
                .get();
        }

        if let Some(value) = lookup(DEBUG_VAR) {
            settings.debug = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }

        Ok(settings)
    }

    /// Pool size for a pipeline: the document's value wins over the environment
    pub fn concurrency_for(&self, configured: Option<usize>) -> usize {
        configured.filter(|n| *n > 0).unwrap_or(self.concurrency).max(1)
    }
}

fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
